use sqlx::{Pool, Sqlite};

use super::attributes::{create_attribute, get_attributes, list_attributes, Attribute};
use crate::{
    error::ApiError,
    schema::{Id, Tag},
};

impl Attribute for Tag {
    const TABLE: &'static str = "tags";
    const FIELD: &'static str = "tags";

    fn id(&self) -> Id {
        self.id
    }
}

pub async fn list_tags(owner: Id, pool: &Pool<Sqlite>) -> Result<Vec<Tag>, ApiError> {
    list_attributes(owner, pool).await
}

pub async fn create_tag(owner: Id, name: &str, pool: &Pool<Sqlite>) -> Result<Tag, ApiError> {
    create_attribute(owner, name, pool).await
}

pub async fn get_tag(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Tag>, ApiError> {
    Ok(get_attributes(&[id], pool).await?.into_iter().next())
}
