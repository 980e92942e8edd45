use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;
use thiserror::Error;

/// Key used for problems that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Field-level validation failures, serialized as `{"field": ["message", ..]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        let mut error = Self::default();
        error.add(field, message);
        error
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect::<Vec<String>>()
            .join("; ");

        write!(f, "({summary})")
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_grouped_per_field() {
        let mut error = ValidationError::new("title", "This field is required.");
        error.add("title", "Second problem.");
        error.add("price", "A valid number is required.");

        assert_eq!(error.messages("title").len(), 2);
        assert_eq!(error.messages("price"), ["A valid number is required."]);
        assert!(error.messages("link").is_empty());

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "price": ["A valid number is required."],
                "title": ["This field is required.", "Second problem."],
            })
        );
    }

    #[test]
    fn display_lists_every_field() {
        let error = ValidationError::new("email", "Users must have an email address.");
        assert_eq!(error.to_string(), "(email: Users must have an email address.)");
    }
}
