//! Shared store for per-user labels (tags and ingredients): list and create
//! scoped to an owner, plus lookups used when recipes link to them.

use log::info;
use sqlx::{sqlite::SqliteRow, FromRow, Pool, QueryBuilder, Sqlite};

use crate::{
    error::{ApiError, ValidationError},
    schema::Id,
};

pub trait Attribute: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Recipe field that references this attribute.
    const FIELD: &'static str;

    fn id(&self) -> Id;
}

/// The owner's attributes, ordered by name descending.
pub async fn list_attributes<T: Attribute>(
    owner: Id,
    pool: &Pool<Sqlite>,
) -> Result<Vec<T>, ApiError> {
    let rows: Vec<T> = sqlx::query_as(&format!(
        "SELECT id, user_id, name FROM {} WHERE user_id = $1 ORDER BY name DESC",
        T::TABLE
    ))
    .bind(owner)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn create_attribute<T: Attribute>(
    owner: Id,
    name: &str,
    pool: &Pool<Sqlite>,
) -> Result<T, ApiError> {
    let row: T = sqlx::query_as(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        T::TABLE
    ))
    .bind(owner)
    .bind(name)
    .fetch_one(pool)
    .await?;

    info!("Created {} entry {name:?} for user {owner}", T::TABLE);
    Ok(row)
}

/// Attributes with the given ids, whoever owns them, ordered by id.
pub async fn get_attributes<T: Attribute>(
    ids: &[Id],
    pool: &Pool<Sqlite>,
) -> Result<Vec<T>, ApiError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT id, user_id, name FROM {} WHERE id IN (",
        T::TABLE
    ));
    let mut separated = query_builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY id");

    let rows: Vec<T> = query_builder.build_query_as().fetch_all(pool).await?;
    Ok(rows)
}

/// Fails with a field error naming the first id that does not exist.
pub async fn ensure_attributes_exist<T: Attribute>(
    ids: &[Id],
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let found: Vec<Id> = get_attributes::<T>(ids, pool)
        .await?
        .into_iter()
        .map(|row| row.id())
        .collect();

    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(ValidationError::new(
            T::FIELD,
            format!("Invalid pk \"{missing}\" - object does not exist."),
        )
        .into()),
        None => Ok(()),
    }
}
