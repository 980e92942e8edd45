use sqlx::{Pool, Sqlite};

use super::attributes::{create_attribute, get_attributes, list_attributes, Attribute};
use crate::{
    error::ApiError,
    schema::{Id, Ingredient},
};

impl Attribute for Ingredient {
    const TABLE: &'static str = "ingredients";
    const FIELD: &'static str = "ingredients";

    fn id(&self) -> Id {
        self.id
    }
}

pub async fn list_ingredients(owner: Id, pool: &Pool<Sqlite>) -> Result<Vec<Ingredient>, ApiError> {
    list_attributes(owner, pool).await
}

pub async fn create_ingredient(
    owner: Id,
    name: &str,
    pool: &Pool<Sqlite>,
) -> Result<Ingredient, ApiError> {
    create_attribute(owner, name, pool).await
}

pub async fn get_ingredient(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Ingredient>, ApiError> {
    Ok(get_attributes(&[id], pool).await?.into_iter().next())
}
