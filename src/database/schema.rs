use std::fmt::{self, Display};

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::QueryError;

pub type Id = i64;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Id,
    pub email: String,
    /// Argon2 PHC string, never the plaintext.
    pub password: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Public view of an account.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            name: user.name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: Id,
    #[serde(skip)]
    pub user_id: Id,
    pub name: String,
}

impl Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Id,
    #[serde(skip)]
    pub user_id: Id,
    pub name: String,
}

impl Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub time_minutes: i64,
    pub price: String,
    pub link: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub time_minutes: i64,
    pub price: Decimal,
    pub link: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<Id>,
}

impl Recipe {
    pub fn from_row(
        row: RecipeRow,
        tags: Vec<Id>,
        ingredients: Vec<Id>,
    ) -> Result<Self, QueryError> {
        let price: Decimal = row.price.parse().map_err(|e| {
            QueryError::DataCorruption(format!("invalid price for recipe {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            time_minutes: row.time_minutes,
            price,
            link: row.link,
            image: row.image,
            tags,
            ingredients,
        })
    }
}

impl Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Fields of a recipe as supplied on create or full update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i64,
    pub price: Decimal,
    pub link: Option<String>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<Id>,
}

impl NewRecipe {
    pub fn new(title: &str, time_minutes: i64, price: Decimal) -> Self {
        Self {
            title: title.to_owned(),
            time_minutes,
            price,
            link: None,
            tags: vec![],
            ingredients: vec![],
        }
    }
}

/// A set of recipe edits; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i64>,
    pub price: Option<Decimal>,
    pub link: Option<Option<String>>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeChanges {
    /// Complete recipe, if every required field is present.
    pub fn into_new_recipe(self) -> Option<NewRecipe> {
        Some(NewRecipe {
            title: self.title?,
            time_minutes: self.time_minutes?,
            price: self.price?,
            link: self.link.flatten(),
            tags: self.tags.unwrap_or_default(),
            ingredients: self.ingredients.unwrap_or_default(),
        })
    }
}

/// Full replacement: anything left out of the recipe is cleared.
impl From<NewRecipe> for RecipeChanges {
    fn from(recipe: NewRecipe) -> Self {
        Self {
            title: Some(recipe.title),
            time_minutes: Some(recipe.time_minutes),
            price: Some(recipe.price),
            link: Some(recipe.link),
            tags: Some(recipe.tags),
            ingredients: Some(recipe.ingredients),
        }
    }
}

/// Reference-only representation: related tags and ingredients by id.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeSummary {
    pub id: Id,
    pub title: String,
    pub ingredients: Vec<Id>,
    pub tags: Vec<Id>,
    pub time_minutes: i64,
    pub price: Decimal,
    pub link: Option<String>,
    pub image: Option<String>,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            ingredients: recipe.ingredients,
            tags: recipe.tags,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            image: recipe.image,
        }
    }
}

impl RecipeSummary {
    /// Swaps the id lists for the resolved objects.
    pub fn into_detail(self, tags: Vec<Tag>, ingredients: Vec<Ingredient>) -> RecipeDetail {
        RecipeDetail {
            id: self.id,
            title: self.title,
            ingredients,
            tags,
            time_minutes: self.time_minutes,
            price: self.price,
            link: self.link,
            image: self.image,
        }
    }
}

/// Nested representation used by the single-recipe view.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeDetail {
    pub id: Id,
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub tags: Vec<Tag>,
    pub time_minutes: i64,
    pub price: Decimal,
    pub link: Option<String>,
    pub image: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeImage {
    pub id: Id,
    pub image: String,
}
