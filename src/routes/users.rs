use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use warp::{http::StatusCode, reject::Rejection, reply, Filter, Reply};

use super::json_body;
use crate::{
    actions::users::{create_user_with_name, get_user, login_user, update_user},
    constants::{NAME_MAX_LENGTH, PASSWORD_MIN_LENGTH},
    error::ApiError,
    form::{Form, FormData},
    jwt::SessionData,
    middleware::with_session,
    schema::{UserChanges, UserProfile},
    state::{with_state, AppState},
};

const INVALID_EMAIL: &str = "Enter a valid email address.";

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let create_route = warp::path!("user" / "create")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create);

    let token_route = warp::path!("user" / "token")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(token);

    let me_route = warp::path!("user" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(me);

    let update_me_route = warp::path!("user" / "me")
        .and(warp::patch())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state))
        .and_then(update_me);

    create_route
        .or(token_route)
        .or(me_route)
        .or(update_me_route)
}

async fn create(data: FormData, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let mut form = Form::from_data(data);

    let email = form.get_str("email", NAME_MAX_LENGTH);
    if matches!(&email, Some(email) if !email.contains('@')) {
        form.reject("email", INVALID_EMAIL);
    }
    let password = read_password(&mut form);
    let name = form
        .get_optional_str("name", NAME_MAX_LENGTH)
        .flatten()
        .unwrap_or_default();

    let (email, password) = form.complete(email.zip(password))?;

    let user = create_user_with_name(&email, &password, &name, &state.pool).await?;
    Ok(reply::with_status(
        reply::json(&UserProfile::from(&user)),
        StatusCode::CREATED,
    ))
}

async fn token(data: FormData, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let mut form = Form::from_data(data);
    let email = form.get_str("email", NAME_MAX_LENGTH);
    let password = form.get_str("password", NAME_MAX_LENGTH);
    let (email, password) = form.complete(email.zip(password))?;

    let token = login_user(
        &email,
        &password,
        &state.config.jwt_secret,
        Duration::hours(state.config.token_ttl_hours),
        &state.pool,
    )
    .await?;

    Ok(reply::json(&json!({ "token": token })))
}

async fn me(session: SessionData, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let user = get_user(session.user_id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(reply::json(&UserProfile::from(&user)))
}

async fn update_me(
    session: SessionData,
    data: FormData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let mut form = Form::from_data(data);
    let mut changes = UserChanges::default();

    if form.contains("name") {
        changes.name = form
            .get_optional_str("name", NAME_MAX_LENGTH)
            .map(Option::unwrap_or_default);
    }
    if form.contains("password") {
        changes.password = read_password(&mut form);
    }
    let changes = form.complete(Some(changes))?;

    let user = update_user(session.user_id, changes, &state.pool).await?;
    Ok(reply::json(&UserProfile::from(&user)))
}

fn read_password(form: &mut Form) -> Option<String> {
    let password = form.get_str("password", NAME_MAX_LENGTH)?;
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        form.reject(
            "password",
            format!("Ensure this field has at least {PASSWORD_MIN_LENGTH} characters."),
        );
        return None;
    }
    Some(password)
}
