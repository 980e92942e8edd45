use std::{collections::HashMap, str::FromStr};

use rust_decimal::Decimal;
use serde_json::Value;

use super::{error::ValidationError, schema::Id};

pub type FormData = HashMap<String, Value>;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";

/// A decoded JSON object whose fields are read one by one, collecting every
/// problem instead of stopping at the first.
pub struct Form {
    inner: FormData,
    errors: ValidationError,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self {
            inner: data,
            errors: ValidationError::default(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn reject(&mut self, key: &str, message: impl Into<String>) {
        self.errors.add(key, message);
    }

    /// Required, non-blank string of at most `max_length` characters.
    pub fn get_str(&mut self, key: &str, max_length: usize) -> Option<String> {
        match self.inner.get(key) {
            None => self.fail(key, REQUIRED),
            Some(Value::Null) => self.fail(key, NOT_NULL),
            Some(Value::String(value)) if value.trim().is_empty() => self.fail(key, NOT_BLANK),
            Some(Value::String(value)) => {
                let value = value.to_owned();
                self.check_length(key, value, max_length)
            }
            Some(_) => self.fail(key, NOT_A_STRING),
        }
    }

    /// `None` when absent, `Some(None)` when null or blank.
    pub fn get_optional_str(&mut self, key: &str, max_length: usize) -> Option<Option<String>> {
        match self.inner.get(key) {
            None => None,
            Some(Value::Null) => Some(None),
            Some(Value::String(value)) if value.trim().is_empty() => Some(None),
            Some(Value::String(value)) => {
                let value = value.to_owned();
                self.check_length(key, value, max_length).map(Some)
            }
            Some(_) => self.fail(key, NOT_A_STRING),
        }
    }

    pub fn get_integer(&mut self, key: &str) -> Option<i64> {
        self.get_number(key, "A valid integer is required.")
    }

    /// Decimal with at most `max_digits` digits, `decimal_places` of them
    /// after the point; returned rescaled to exactly `decimal_places`.
    pub fn get_decimal(
        &mut self,
        key: &str,
        max_digits: u32,
        decimal_places: u32,
    ) -> Option<Decimal> {
        let mut value: Decimal = self.get_number(key, "A valid number is required.")?;

        if value.scale() > decimal_places {
            return self.fail(
                key,
                format!("Ensure that there are no more than {decimal_places} decimal places."),
            );
        }

        value.rescale(decimal_places);
        let digits = value.mantissa().unsigned_abs().to_string().len() as u32;
        if digits > max_digits {
            return self.fail(
                key,
                format!("Ensure that there are no more than {max_digits} digits in total."),
            );
        }

        Some(value)
    }

    /// List of primary keys. Absent keys yield `None`.
    pub fn get_ids(&mut self, key: &str) -> Option<Vec<Id>> {
        let items = match self.inner.get(key)? {
            Value::Array(items) => items.to_owned(),
            Value::Null => return self.fail(key, NOT_NULL),
            other => {
                let message = format!(
                    "Expected a list of items but got type \"{}\".",
                    type_name(other)
                );
                return self.fail(key, message);
            }
        };

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let id = match &item {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.parse::<Id>().ok(),
                _ => None,
            };

            match id {
                Some(id) => ids.push(id),
                None => {
                    let message = format!(
                        "Incorrect type. Expected pk value, received {}.",
                        type_name(&item)
                    );
                    return self.fail(key, message);
                }
            }
        }

        Some(ids)
    }

    /// `value`, unless any field was rejected along the way.
    pub fn complete<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(self.errors),
        }
    }

    fn get_number<T>(&mut self, key: &str, invalid: &str) -> Option<T>
    where
        T: FromStr,
    {
        let raw = match self.inner.get(key) {
            None => return self.fail(key, REQUIRED),
            Some(Value::Null) => return self.fail(key, NOT_NULL),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.trim().to_owned(),
            Some(_) => return self.fail(key, invalid),
        };

        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => self.fail(key, invalid),
        }
    }

    fn check_length(&mut self, key: &str, value: String, max_length: usize) -> Option<String> {
        if value.chars().count() > max_length {
            return self.fail(
                key,
                format!("Ensure this field has no more than {max_length} characters."),
            );
        }
        Some(value)
    }

    fn fail<T>(&mut self, key: &str, message: impl Into<String>) -> Option<T> {
        self.reject(key, message);
        None
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
