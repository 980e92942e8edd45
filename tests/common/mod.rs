#![allow(dead_code)]

use std::{io::Cursor, sync::Arc};

use bytes::Bytes;
use chrono::Duration;
use image::{DynamicImage, ImageFormat};
use recepie_api::{
    actions::{recipes::create_recipe, users::create_user},
    config::Config,
    jwt::generate_session_token,
    routes,
    schema::{Id, NewRecipe, Recipe, User},
    state::{connect_in_memory, AppState},
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use warp::http::Response;

pub const BOUNDARY: &str = "recepie-test-boundary";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub media: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let pool = connect_in_memory().await.unwrap();
        let state = AppState::with_pool(pool, Config::for_tests(media.path()));

        Self { state, media }
    }

    /// A user plus a ready-to-send `Authorization` header value.
    pub async fn user(&self, email: &str) -> (User, String) {
        let user = create_user(email, "testpass123", &self.state.pool)
            .await
            .unwrap();
        let token = generate_session_token(&user, &self.state.config.jwt_secret, Duration::hours(1))
            .unwrap();

        (user, format!("Token {token}"))
    }

    pub async fn recipe(&self, owner: Id, title: &str) -> Recipe {
        let recipe = NewRecipe::new(title, 10, Decimal::new(500, 2));
        create_recipe(owner, recipe, &self.state.pool).await.unwrap()
    }

    pub async fn send(&self, request: warp::test::RequestBuilder) -> Response<Bytes> {
        request.reply(&routes::api(self.state.clone())).await
    }
}

pub fn body(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

pub fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::new_rgb8(10, 10)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// One file part named `field`.
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
