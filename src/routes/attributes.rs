use std::sync::Arc;

use serde::Serialize;
use warp::{http::StatusCode, reject::Rejection, reply, Filter, Reply};

use super::json_body;
use crate::{
    actions::attributes::{create_attribute, list_attributes, Attribute},
    constants::NAME_MAX_LENGTH,
    form::{Form, FormData},
    jwt::SessionData,
    middleware::with_session,
    state::{with_state, AppState},
};

/// `GET /<segment>` and `POST /<segment>` for one attribute kind.
pub fn routes<T>(
    segment: &'static str,
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    T: Attribute + Serialize + 'static,
{
    let list_route = warp::path(segment)
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list::<T>);

    let create_route = warp::path(segment)
        .and(warp::path::end())
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state))
        .and_then(create::<T>);

    list_route.or(create_route)
}

async fn list<T>(session: SessionData, state: Arc<AppState>) -> Result<impl Reply, Rejection>
where
    T: Attribute + Serialize,
{
    let rows: Vec<T> = list_attributes(session.user_id, &state.pool).await?;
    Ok(reply::json(&rows))
}

async fn create<T>(
    session: SessionData,
    data: FormData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection>
where
    T: Attribute + Serialize,
{
    let mut form = Form::from_data(data);
    let name = form.get_str("name", NAME_MAX_LENGTH);
    let name = form.complete(name)?;

    let row: T = create_attribute(session.user_id, &name, &state.pool).await?;
    Ok(reply::with_status(reply::json(&row), StatusCode::CREATED))
}
