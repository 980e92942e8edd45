use std::sync::Arc;

use log::warn;
use warp::{reject::Rejection, Filter};

use super::jwt::{verify_session_token, SessionData};
use crate::{
    actions::users::get_user,
    error::{ApiError, CREDENTIALS_NOT_PROVIDED, INACTIVE_USER, INVALID_TOKEN},
    state::{with_state, AppState},
};

/// Extracts the token from `Token <t>` or `Bearer <t>`.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    let known = scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    if !known || token.is_empty() {
        return None;
    }
    Some(token)
}

pub async fn authenticate(header: Option<String>, state: &AppState) -> Result<SessionData, ApiError> {
    let header = header.ok_or(ApiError::Authentication(CREDENTIALS_NOT_PROVIDED))?;
    let token = parse_authorization(&header).ok_or(ApiError::Authentication(INVALID_TOKEN))?;
    let session = verify_session_token(token, &state.config.jwt_secret)?;

    match get_user(session.user_id, &state.pool).await? {
        Some(user) if user.is_active => Ok(SessionData::from(&user)),
        _ => {
            warn!("Token for user {} no longer maps to an active account", session.user_id);
            Err(ApiError::Authentication(INACTIVE_USER))
        }
    }
}

/// Requires a valid token; rejects with 401 otherwise.
pub fn with_session(
    state: Arc<AppState>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: Arc<AppState>| async move {
            authenticate(header, &state).await.map_err(Rejection::from)
        })
}
