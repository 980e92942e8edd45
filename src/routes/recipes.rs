use std::sync::Arc;

use bytes::BufMut;
use futures_util::{pin_mut, TryStreamExt};
use log::warn;
use warp::{
    http::StatusCode,
    multipart::{FormData as Multipart, Part},
    reject::Rejection,
    reply, Filter, Reply,
};

use super::json_body;
use crate::{
    actions::recipes,
    constants::{IMAGE_FIELD, NAME_MAX_LENGTH, PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS},
    error::{ApiError, ValidationError, NON_FIELD_ERRORS},
    form::{Form, FormData},
    jwt::SessionData,
    middleware::with_session,
    schema::{Id, NewRecipe, RecipeChanges, RecipeImage, RecipeSummary},
    state::{with_state, AppState},
};

const NO_FILE: &str = "No file was submitted.";
const NOT_A_FILE: &str =
    "The submitted data was not a file. Check the encoding type on the form.";
const NEGATIVE_TIME: &str = "Ensure this value is greater than or equal to 0.";

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_route = warp::path!("recepies")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list);

    let create_route = warp::path!("recepies")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create);

    let retrieve_route = warp::path!("recepies" / Id)
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve);

    let update_route = warp::path!("recepies" / Id)
        .and(warp::put())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update);

    let partial_update_route = warp::path!("recepies" / Id)
        .and(warp::patch())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(partial_update);

    let destroy_route = warp::path!("recepies" / Id)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(destroy);

    let upload_route = warp::path!("recepies" / Id / "upload-image")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(warp::multipart::form().max_length(state.config.max_upload_bytes))
        .and(with_state(state))
        .and_then(upload_image);

    list_route
        .or(create_route)
        .or(retrieve_route)
        .or(update_route)
        .or(partial_update_route)
        .or(destroy_route)
        .or(upload_route)
}

async fn list(session: SessionData, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let rows: Vec<RecipeSummary> = recipes::list_recipes(session.user_id, &state.pool)
        .await?
        .into_iter()
        .map(RecipeSummary::from)
        .collect();

    Ok(reply::json(&rows))
}

async fn create(
    session: SessionData,
    data: FormData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let recipe = parse_recipe(data)?;
    let created = recipes::create_recipe(session.user_id, recipe, &state.pool).await?;

    Ok(reply::with_status(
        reply::json(&RecipeSummary::from(created)),
        StatusCode::CREATED,
    ))
}

async fn retrieve(
    id: Id,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let detail = recipes::get_recipe_detail(session.user_id, id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(reply::json(&detail))
}

async fn update(
    id: Id,
    session: SessionData,
    data: FormData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let recipe = parse_recipe(data)?;
    let updated = recipes::full_update(session.user_id, id, recipe, &state.pool).await?;

    Ok(reply::json(&RecipeSummary::from(updated)))
}

async fn partial_update(
    id: Id,
    session: SessionData,
    data: FormData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let changes = parse_changes(data, true)?;
    let updated = recipes::partial_update(session.user_id, id, changes, &state.pool).await?;

    Ok(reply::json(&RecipeSummary::from(updated)))
}

async fn destroy(
    id: Id,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    recipes::delete_recipe(session.user_id, id, &state.media, &state.pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_image(
    id: Id,
    session: SessionData,
    form: Multipart,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    recipes::get_recipe(session.user_id, id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    let (filename, data) = read_image_part(form)
        .await?
        .ok_or_else(|| ValidationError::new(IMAGE_FIELD, NO_FILE))?;

    let image = recipes::upload_image(
        session.user_id,
        id,
        &filename,
        &data,
        &state.media,
        &state.pool,
    )
    .await?;

    Ok(reply::json(&RecipeImage { id, image }))
}

/// Filename and bytes of the first `image` part; other parts are skipped.
async fn read_image_part(form: Multipart) -> Result<Option<(String, Vec<u8>)>, ValidationError> {
    pin_mut!(form);

    while let Some(part) = form.try_next().await.map_err(malformed_upload)? {
        if part.name() != IMAGE_FIELD {
            continue;
        }
        let Some(filename) = part.filename().map(str::to_owned) else {
            return Err(ValidationError::new(IMAGE_FIELD, NOT_A_FILE));
        };

        let data = read_part(part).await?;
        if data.is_empty() {
            return Err(ValidationError::new(IMAGE_FIELD, "The submitted file is empty."));
        }
        return Ok(Some((filename, data)));
    }

    Ok(None)
}

async fn read_part(part: Part) -> Result<Vec<u8>, ValidationError> {
    part.stream()
        .try_fold(Vec::new(), |mut data, buf| async move {
            data.put(buf);
            Ok(data)
        })
        .await
        .map_err(malformed_upload)
}

fn malformed_upload(e: warp::Error) -> ValidationError {
    warn!("Malformed multipart upload: {e}");
    ValidationError::new(IMAGE_FIELD, NOT_A_FILE)
}

/// Every field required; omitted optional ones are cleared.
fn parse_recipe(data: FormData) -> Result<NewRecipe, ValidationError> {
    parse_changes(data, false)?
        .into_new_recipe()
        .ok_or_else(|| ValidationError::new(NON_FIELD_ERRORS, "Invalid data."))
}

/// With `partial`, only the supplied fields are read.
fn parse_changes(data: FormData, partial: bool) -> Result<RecipeChanges, ValidationError> {
    let mut form = Form::from_data(data);
    let mut changes = RecipeChanges::default();

    if !partial || form.contains("title") {
        changes.title = form.get_str("title", NAME_MAX_LENGTH);
    }
    if !partial || form.contains("time_minutes") {
        changes.time_minutes = match form.get_integer("time_minutes") {
            Some(minutes) if minutes < 0 => {
                form.reject("time_minutes", NEGATIVE_TIME);
                None
            }
            minutes => minutes,
        };
    }
    if !partial || form.contains("price") {
        changes.price = form.get_decimal("price", PRICE_MAX_DIGITS, PRICE_DECIMAL_PLACES);
    }
    changes.link = form.get_optional_str("link", NAME_MAX_LENGTH);
    changes.tags = form.get_ids("tags");
    changes.ingredients = form.get_ids("ingredients");

    form.complete(Some(changes))
}
