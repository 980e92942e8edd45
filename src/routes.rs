//! HTTP surface. Every resource route requires a session; the user routes
//! that issue sessions do not.

use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter, Reply};

use crate::{
    constants::JSON_BODY_LIMIT,
    error::handle_rejection,
    form::FormData,
    schema::{Ingredient, Tag},
    state::AppState,
};

pub mod attributes;
pub mod recipes;
pub mod users;

/// The whole API with rejections already turned into JSON replies.
pub fn api(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    users::routes(state.clone())
        .or(attributes::routes::<Tag>("tags", state.clone()))
        .or(attributes::routes::<Ingredient>("ingredients", state.clone()))
        .or(recipes::routes(state))
        .recover(handle_rejection)
        .with(warp::log("recepie_api::http"))
}

pub(crate) fn json_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(JSON_BODY_LIMIT).and(warp::body::json())
}
