use std::collections::HashMap;

use log::{info, warn};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use super::attributes::{ensure_attributes_exist, get_attributes};
use crate::{
    error::ApiError,
    media::{recipe_image_file_path, validate_image, MediaStorage},
    schema::{
        Id, Ingredient, NewRecipe, Recipe, RecipeChanges, RecipeDetail, RecipeRow, RecipeSummary,
        Tag,
    },
};

/// Many-to-many table between recipes and one attribute kind.
struct LinkTable {
    table: &'static str,
    column: &'static str,
}

const TAG_LINKS: LinkTable = LinkTable {
    table: "recipe_tags",
    column: "tag_id",
};

const INGREDIENT_LINKS: LinkTable = LinkTable {
    table: "recipe_ingredients",
    column: "ingredient_id",
};

/// The owner's recipes, newest first.
pub async fn list_recipes(owner: Id, pool: &Pool<Sqlite>) -> Result<Vec<Recipe>, ApiError> {
    let rows: Vec<RecipeRow> =
        sqlx::query_as("SELECT * FROM recipes WHERE user_id = $1 ORDER BY id DESC")
            .bind(owner)
            .fetch_all(pool)
            .await?;

    let mut tags = owner_links(&TAG_LINKS, owner, pool).await?;
    let mut ingredients = owner_links(&INGREDIENT_LINKS, owner, pool).await?;

    rows.into_iter()
        .map(|row| {
            let row_tags = tags.remove(&row.id).unwrap_or_default();
            let row_ingredients = ingredients.remove(&row.id).unwrap_or_default();
            Recipe::from_row(row, row_tags, row_ingredients).map_err(ApiError::from)
        })
        .collect()
}

/// A recipe owned by `owner`; someone else's recipe is reported as absent.
pub async fn get_recipe(owner: Id, id: Id, pool: &Pool<Sqlite>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<RecipeRow> =
        sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let tags = recipe_links(&TAG_LINKS, row.id, pool).await?;
    let ingredients = recipe_links(&INGREDIENT_LINKS, row.id, pool).await?;

    Ok(Some(Recipe::from_row(row, tags, ingredients)?))
}

/// Summary first, then tags and ingredients resolved into full objects.
pub async fn get_recipe_detail(
    owner: Id,
    id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Option<RecipeDetail>, ApiError> {
    let Some(recipe) = get_recipe(owner, id, pool).await? else {
        return Ok(None);
    };

    let summary = RecipeSummary::from(recipe);
    let tags: Vec<Tag> = get_attributes(&summary.tags, pool).await?;
    let ingredients: Vec<Ingredient> = get_attributes(&summary.ingredients, pool).await?;

    Ok(Some(summary.into_detail(tags, ingredients)))
}

pub async fn create_recipe(
    owner: Id,
    recipe: NewRecipe,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    let tags = unique(recipe.tags);
    let ingredients = unique(recipe.ingredients);
    ensure_attributes_exist::<Tag>(&tags, pool).await?;
    ensure_attributes_exist::<Ingredient>(&ingredients, pool).await?;

    let mut tr = pool.begin().await?;

    let (id,): (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, time_minutes, price, link)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(owner)
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price.to_string())
    .bind(&recipe.link)
    .fetch_one(&mut *tr)
    .await?;

    replace_links(&mut tr, &TAG_LINKS, id, &tags).await?;
    replace_links(&mut tr, &INGREDIENT_LINKS, id, &ingredients).await?;

    tr.commit().await?;

    info!("Created recipe {id} {:?} for user {owner}", recipe.title);
    get_recipe(owner, id, pool).await?.ok_or(ApiError::NotFound)
}

/// Applies only the supplied fields. A supplied tag or ingredient list
/// replaces the stored one.
pub async fn partial_update(
    owner: Id,
    id: Id,
    changes: RecipeChanges,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    apply_changes(owner, id, changes, pool).await
}

/// Replaces every field; a missing link, tag list or ingredient list is cleared.
pub async fn full_update(
    owner: Id,
    id: Id,
    recipe: NewRecipe,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    apply_changes(owner, id, RecipeChanges::from(recipe), pool).await
}

async fn apply_changes(
    owner: Id,
    id: Id,
    changes: RecipeChanges,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    let current = get_recipe(owner, id, pool).await?.ok_or(ApiError::NotFound)?;

    let tags = changes.tags.map(unique);
    let ingredients = changes.ingredients.map(unique);
    if let Some(tags) = &tags {
        ensure_attributes_exist::<Tag>(tags, pool).await?;
    }
    if let Some(ingredients) = &ingredients {
        ensure_attributes_exist::<Ingredient>(ingredients, pool).await?;
    }

    let title = changes.title.unwrap_or(current.title);
    let time_minutes = changes.time_minutes.unwrap_or(current.time_minutes);
    let price = changes.price.unwrap_or(current.price);
    let link = changes.link.unwrap_or(current.link);

    let mut tr = pool.begin().await?;

    sqlx::query(
        "
        UPDATE recipes SET
        title = $1,
        time_minutes = $2,
        price = $3,
        link = $4
        WHERE id = $5 AND user_id = $6
    ",
    )
    .bind(title)
    .bind(time_minutes)
    .bind(price.to_string())
    .bind(link)
    .bind(id)
    .bind(owner)
    .execute(&mut *tr)
    .await?;

    if let Some(tags) = &tags {
        replace_links(&mut tr, &TAG_LINKS, id, tags).await?;
    }
    if let Some(ingredients) = &ingredients {
        replace_links(&mut tr, &INGREDIENT_LINKS, id, ingredients).await?;
    }

    tr.commit().await?;

    get_recipe(owner, id, pool).await?.ok_or(ApiError::NotFound)
}

/// Removes the recipe, its links and its image file.
pub async fn delete_recipe(
    owner: Id,
    id: Id,
    media: &MediaStorage,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    delete_image(owner, id, media, pool).await?;

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    info!("Deleted recipe {id} of user {owner}");
    Ok(())
}

/// Validates `data` as an image, stores it under a fresh path and records
/// that path on the recipe. Nothing is written when validation fails.
pub async fn upload_image(
    owner: Id,
    id: Id,
    filename: &str,
    data: &[u8],
    media: &MediaStorage,
    pool: &Pool<Sqlite>,
) -> Result<String, ApiError> {
    let recipe = get_recipe(owner, id, pool).await?.ok_or(ApiError::NotFound)?;
    validate_image(data)?;

    let path = recipe_image_file_path(filename);
    media.save(&path, data).await?;

    let updated = sqlx::query("UPDATE recipes SET image = $1 WHERE id = $2 AND user_id = $3")
        .bind(&path)
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await;

    if let Err(e) = updated {
        if let Err(cleanup) = media.delete(&path).await {
            warn!("Could not remove orphaned upload {path}: {cleanup}");
        }
        return Err(e.into());
    }

    if let Some(previous) = recipe.image {
        if let Err(e) = media.delete(&previous).await {
            warn!("Could not remove replaced image {previous}: {e}");
        }
    }

    info!("Stored image {path} for recipe {id}");
    Ok(path)
}

/// Clears the image reference and removes the file behind it.
pub async fn delete_image(
    owner: Id,
    id: Id,
    media: &MediaStorage,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let recipe = get_recipe(owner, id, pool).await?.ok_or(ApiError::NotFound)?;
    let Some(image) = recipe.image else {
        return Ok(());
    };

    sqlx::query("UPDATE recipes SET image = NULL WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;

    media.delete(&image).await?;
    Ok(())
}

async fn owner_links(
    links: &LinkTable,
    owner: Id,
    pool: &Pool<Sqlite>,
) -> Result<HashMap<Id, Vec<Id>>, ApiError> {
    let pairs: Vec<(Id, Id)> = sqlx::query_as(&format!(
        "
        SELECT l.recipe_id, l.{column}
        FROM {table} l
        INNER JOIN recipes r ON r.id = l.recipe_id
        WHERE r.user_id = $1
        ORDER BY l.{column}
    ",
        table = links.table,
        column = links.column
    ))
    .bind(owner)
    .fetch_all(pool)
    .await?;

    let mut hashmap: HashMap<Id, Vec<Id>> = HashMap::new();
    pairs
        .into_iter()
        .for_each(|(recipe_id, id)| hashmap.entry(recipe_id).or_default().push(id));

    Ok(hashmap)
}

async fn recipe_links(
    links: &LinkTable,
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Id>, ApiError> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT {column} FROM {table} WHERE recipe_id = $1 ORDER BY {column}",
        table = links.table,
        column = links.column
    ))
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

async fn replace_links(
    conn: &mut SqliteConnection,
    links: &LinkTable,
    recipe_id: Id,
    ids: &[Id],
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DELETE FROM {} WHERE recipe_id = $1", links.table))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if ids.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "INSERT INTO {} (recipe_id, {}) ",
        links.table, links.column
    ));
    query_builder.push_values(ids, |mut b, id| {
        b.push_bind(recipe_id).push_bind(*id);
    });
    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}

fn unique(mut ids: Vec<Id>) -> Vec<Id> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat};
    use rust_decimal::Decimal;

    use super::*;
    use crate::actions::{
        ingredients::create_ingredient,
        tags::create_tag,
        testing::{pool, sample_user},
    };

    fn sample(title: &str) -> NewRecipe {
        NewRecipe::new(title, 10, Decimal::new(500, 2))
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(10, 10)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn recipe_str() {
        let pool = pool().await;
        let user = sample_user("test@gmail.com", &pool).await;
        let recipe = create_recipe(user.id, sample("Steak and mushroom sauce"), &pool)
            .await
            .unwrap();

        assert_eq!(recipe.to_string(), recipe.title);
        assert_eq!(recipe.price.to_string(), "5.00");
        assert!(recipe.tags.is_empty());
        assert!(recipe.ingredients.is_empty());
    }

    #[tokio::test]
    async fn create_recipe_with_tags_and_ingredients() {
        let pool = pool().await;
        let user = sample_user("test@gmail.com", &pool).await;
        let vegan = create_tag(user.id, "Vegan", &pool).await.unwrap();
        let dessert = create_tag(user.id, "Dessert", &pool).await.unwrap();
        let prawns = create_ingredient(user.id, "Prawns", &pool).await.unwrap();

        let mut new = sample("Avocado lime cheesecake");
        new.tags = vec![dessert.id, vegan.id, vegan.id];
        new.ingredients = vec![prawns.id];
        let recipe = create_recipe(user.id, new, &pool).await.unwrap();

        assert_eq!(recipe.tags.len(), 2);
        assert!(recipe.tags.contains(&vegan.id));
        assert!(recipe.tags.contains(&dessert.id));
        assert_eq!(recipe.ingredients, [prawns.id]);
    }

    #[tokio::test]
    async fn unknown_links_create_nothing() {
        let pool = pool().await;
        let user = sample_user("test@gmail.com", &pool).await;

        let mut new = sample("Ghost");
        new.tags = vec![404];
        let err = create_recipe(user.id, new, &pool).await.unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert!(list_recipes(user.id, &pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recipes_limited_to_user_newest_first() {
        let pool = pool().await;
        let user = sample_user("test@gmail.com", &pool).await;
        let other = sample_user("other@gmail.com", &pool).await;

        create_recipe(other.id, sample("Theirs"), &pool).await.unwrap();
        let first = create_recipe(user.id, sample("First"), &pool).await.unwrap();
        let second = create_recipe(user.id, sample("Second"), &pool).await.unwrap();

        let ids: Vec<Id> = list_recipes(user.id, &pool)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, [second.id, first.id]);

        assert!(get_recipe(other.id, first.id, &pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn detail_resolves_nested_objects() {
        let pool = pool().await;
        let user = sample_user("test@gmail.com", &pool).await;
        let tag = create_tag(user.id, "Dinner", &pool).await.unwrap();
        let ingredient = create_ingredient(user.id, "Salt", &pool).await.unwrap();

        let mut new = sample("Soup");
        new.tags = vec![tag.id];
        new.ingredients = vec![ingredient.id];
        let recipe = create_recipe(user.id, new, &pool).await.unwrap();

        let detail = get_recipe_detail(user.id, recipe.id, &pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.tags, [tag]);
        assert_eq!(detail.ingredients, [ingredient]);
        assert_eq!(detail.title, "Soup");
    }

    #[tokio::test]
    async fn partial_update_replaces_tags() {
        let pool = pool().await;
        let user = sample_user("test@gmail.com", &pool).await;
        let old = create_tag(user.id, "Spicy", &pool).await.unwrap();
        let new_tag = create_tag(user.id, "Curry", &pool).await.unwrap();

        let mut new = sample("Chicken tikka");
        new.tags = vec![old.id];
        let recipe = create_recipe(user.id, new, &pool).await.unwrap();

        let changes = RecipeChanges {
            title: Some("Chicken tikka masala".to_owned()),
            tags: Some(vec![new_tag.id]),
            ..Default::default()
        };
        let updated = partial_update(user.id, recipe.id, changes, &pool).await.unwrap();

        assert_eq!(updated.title, "Chicken tikka masala");
        assert_eq!(updated.tags, [new_tag.id]);
        assert_eq!(updated.time_minutes, recipe.time_minutes);
        assert_eq!(updated.price, recipe.price);
    }

    #[tokio::test]
    async fn full_update_clears_omitted_links() {
        let pool = pool().await;
        let user = sample_user("test@gmail.com", &pool).await;
        let tag = create_tag(user.id, "Spicy", &pool).await.unwrap();

        let mut new = sample("Chicken tikka");
        new.tags = vec![tag.id];
        new.link = Some("https://example.com".to_owned());
        let recipe = create_recipe(user.id, new, &pool).await.unwrap();

        let replacement = NewRecipe::new("Spaghetti carbonara", 25, Decimal::new(500, 2));
        let updated = full_update(user.id, recipe.id, replacement, &pool).await.unwrap();

        assert_eq!(updated.title, "Spaghetti carbonara");
        assert_eq!(updated.time_minutes, 25);
        assert!(updated.tags.is_empty());
        assert_eq!(updated.link, None);
    }

    #[tokio::test]
    async fn other_users_cannot_update() {
        let pool = pool().await;
        let user = sample_user("test@gmail.com", &pool).await;
        let other = sample_user("other@gmail.com", &pool).await;
        let recipe = create_recipe(user.id, sample("Mine"), &pool).await.unwrap();

        let err = partial_update(other.id, recipe.id, RecipeChanges::default(), &pool)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn invalid_upload_writes_nothing() {
        let pool = pool().await;
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(dir.path());
        let user = sample_user("test@gmail.com", &pool).await;
        let recipe = create_recipe(user.id, sample("Toast"), &pool).await.unwrap();

        let err = upload_image(user.id, recipe.id, "bad.jpg", b"notimage", &media, &pool)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        let recipe = get_recipe(user.id, recipe.id, &pool).await.unwrap().unwrap();
        assert!(recipe.image.is_none());
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn upload_replaces_and_delete_cleans_up() {
        let pool = pool().await;
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(dir.path());
        let user = sample_user("test@gmail.com", &pool).await;
        let recipe = create_recipe(user.id, sample("Toast"), &pool).await.unwrap();

        let first = upload_image(user.id, recipe.id, "a.png", &png_bytes(), &media, &pool)
            .await
            .unwrap();
        assert!(first.starts_with("uploads/recipe/"));
        assert!(media.exists(&first).await);

        let second = upload_image(user.id, recipe.id, "b.png", &png_bytes(), &media, &pool)
            .await
            .unwrap();
        assert!(!media.exists(&first).await);
        assert!(media.exists(&second).await);

        let stored = get_recipe(user.id, recipe.id, &pool).await.unwrap().unwrap();
        assert_eq!(stored.image.as_deref(), Some(second.as_str()));

        delete_recipe(user.id, recipe.id, &media, &pool).await.unwrap();
        assert!(!media.exists(&second).await);
        assert!(get_recipe(user.id, recipe.id, &pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_image_clears_the_reference() {
        let pool = pool().await;
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(dir.path());
        let user = sample_user("test@gmail.com", &pool).await;
        let recipe = create_recipe(user.id, sample("Toast"), &pool).await.unwrap();

        let path = upload_image(user.id, recipe.id, "a.png", &png_bytes(), &media, &pool)
            .await
            .unwrap();
        delete_image(user.id, recipe.id, &media, &pool).await.unwrap();

        let stored = get_recipe(user.id, recipe.id, &pool).await.unwrap().unwrap();
        assert!(stored.image.is_none());
        assert!(!media.exists(&path).await);
    }
}
