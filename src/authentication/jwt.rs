use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use log::warn;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    error::{ApiError, INVALID_TOKEN},
    schema::{Id, User},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, ttl: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + ttl).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        (self.exp - now).is_negative()
    }
}

/// The authenticated caller, as seen by request handlers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.to_owned(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("invalid signing key: {e}")))
}

pub fn generate_session_token(user: &User, secret: &str, ttl: Duration) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.email.to_owned(), ttl);

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::Internal(format!("could not sign token: {e}")))
}

pub fn verify_session_token(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|e| {
        warn!("Rejected token: {e}");
        ApiError::Authentication(INVALID_TOKEN)
    })?;

    if session.is_expired(Utc::now().timestamp()) {
        return Err(ApiError::Authentication(INVALID_TOKEN));
    }

    Ok(session)
}
