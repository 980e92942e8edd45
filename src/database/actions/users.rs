use chrono::Duration;
use log::{info, warn};
use sqlx::{Pool, Sqlite};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_session_token,
    },
    error::{ApiError, ValidationError, NON_FIELD_ERRORS},
    schema::{Id, User, UserChanges},
};

const EMAIL_REQUIRED: &str = "Users must have an email address.";
const EMAIL_TAKEN: &str = "user with this email already exists.";
const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials";

/// Trims and lowercases; an empty address is a validation failure.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::new("email", EMAIL_REQUIRED));
    }
    Ok(email.to_lowercase())
}

pub async fn get_user(user_id: Id, pool: &Pool<Sqlite>) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_email(email: &str, pool: &Pool<Sqlite>) -> Result<Option<User>, ApiError> {
    let Ok(email) = normalize_email(email) else {
        return Ok(None);
    };

    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn create_user(email: &str, password: &str, pool: &Pool<Sqlite>) -> Result<User, ApiError> {
    insert_user(email, password, "", false, pool).await
}

pub async fn create_user_with_name(
    email: &str,
    password: &str,
    name: &str,
    pool: &Pool<Sqlite>,
) -> Result<User, ApiError> {
    insert_user(email, password, name, false, pool).await
}

/// Same as [`create_user`], with staff and superuser flags set.
pub async fn create_superuser(
    email: &str,
    password: &str,
    pool: &Pool<Sqlite>,
) -> Result<User, ApiError> {
    insert_user(email, password, "", true, pool).await
}

async fn insert_user(
    email: &str,
    password: &str,
    name: &str,
    superuser: bool,
    pool: &Pool<Sqlite>,
) -> Result<User, ApiError> {
    let email = normalize_email(email)?;
    let password = hash_password(password)?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, password, name, is_staff, is_superuser)
        VALUES ($1, $2, $3, $4, $4)
        RETURNING *
    ",
    )
    .bind(&email)
    .bind(password)
    .bind(name)
    .bind(superuser)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ApiError::from(ValidationError::new("email", EMAIL_TAKEN))
        }
        e => ApiError::from(e),
    })?;

    info!("Created user {} ({})", user.id, user.email);
    Ok(user)
}

/// The user, iff it is active and the password matches its stored hash.
pub async fn authenticate(
    email: &str,
    password: &str,
    pool: &Pool<Sqlite>,
) -> Result<Option<User>, ApiError> {
    let Some(user) = get_user_by_email(email, pool).await? else {
        return Ok(None);
    };

    if !user.is_active || !verify_password(password, &user.password)? {
        return Ok(None);
    }

    Ok(Some(user))
}

/// Checks credentials and issues a session token.
pub async fn login_user(
    email: &str,
    password: &str,
    secret: &str,
    ttl: Duration,
    pool: &Pool<Sqlite>,
) -> Result<String, ApiError> {
    let Some(user) = authenticate(email, password, pool).await? else {
        warn!("Rejected credentials for {email}");
        return Err(ValidationError::new(NON_FIELD_ERRORS, BAD_CREDENTIALS).into());
    };

    generate_session_token(&user, secret, ttl)
}

pub async fn update_user(
    user_id: Id,
    changes: UserChanges,
    pool: &Pool<Sqlite>,
) -> Result<User, ApiError> {
    let password = changes
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let user: Option<User> = sqlx::query_as(
        "
        UPDATE users SET
        name = COALESCE($1, name),
        password = COALESCE($2, password)
        WHERE id = $3
        RETURNING *
    ",
    )
    .bind(changes.name)
    .bind(password)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    user.ok_or(ApiError::NotFound)
}
