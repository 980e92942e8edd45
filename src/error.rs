use std::convert::Infallible;

use log::{error, warn};
use serde_json::{json, Value};
use thiserror::Error;
use warp::{
    http::StatusCode,
    reject::{self, Reject, Rejection},
    Reply,
};

pub use crate::database::error::{QueryError, ValidationError, NON_FIELD_ERRORS};

pub const CREDENTIALS_NOT_PROVIDED: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const INACTIVE_USER: &str = "User inactive or deleted.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("authentication failed: {0}")]
    Authentication(&'static str),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        Self::Query(QueryError::from(value))
    }
}

impl Reject for ApiError {}

impl From<ValidationError> for Rejection {
    fn from(value: ValidationError) -> Self {
        reject::custom(ApiError::from(value))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Query(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Response body. Internal details never leave the process.
    pub fn body(&self) -> Value {
        match self {
            Self::Validation(errors) => json!(errors),
            Self::Authentication(detail) => detail_body(detail),
            Self::NotFound => detail_body("Not found."),
            Self::Query(_) | Self::Storage(_) | Self::Internal(_) => {
                detail_body("Internal server error")
            }
        }
    }
}

fn detail_body(detail: &str) -> Value {
    json!({ "detail": detail })
}

/// Turns every rejection that reaches the top of the filter tree into a JSON reply.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(e) = err.find::<ApiError>() {
        if e.status() == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {e}");
        }
        (e.status(), e.body())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, detail_body("Not found."))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            detail_body(&format!("JSON parse error - {e}")),
        )
    } else if let Some(e) = err.find::<reject::MissingHeader>() {
        (StatusCode::BAD_REQUEST, detail_body(&e.to_string()))
    } else if let Some(e) = err.find::<reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, detail_body(&e.to_string()))
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            detail_body("Method not allowed."),
        )
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            detail_body("Request body is too large."),
        )
    } else if err.find::<reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            detail_body("A content-length header is required."),
        )
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            detail_body("Unsupported media type in request."),
        )
    } else {
        warn!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            detail_body("Internal server error"),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
