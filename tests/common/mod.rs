// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use std::sync::Arc;
use tempfile::TempDir;
use videotube_api::config::Config;
use videotube_api::db::Database;
use videotube_api::models::PublicUser;
use videotube_api::routes::create_router;
use videotube_api::services::{ImageHostClient, RegisterFiles, RegisterInput, StagedFile};
use videotube_api::AppState;

pub const BOUNDARY: &str = "videotube-test-boundary";

/// Stand-in image bytes.
#[allow(dead_code)]
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Router + state over the in-memory database and a mock image host.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub upload_dir: TempDir,
}

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Connect to the Firestore emulator named by `FIRESTORE_EMULATOR_HOST`.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    Database::firestore("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_images(ImageHostClient::new_mock())
}

#[allow(dead_code)]
pub fn create_test_app_with_images(images: ImageHostClient) -> TestApp {
    let upload_dir = tempfile::tempdir().expect("temp upload dir");
    let mut config = Config::test_default();
    config.upload_dir = upload_dir.path().to_path_buf();

    let state = Arc::new(AppState::new(config, Database::in_memory(), images));

    TestApp {
        router: create_router(state.clone()),
        state,
        upload_dir,
    }
}

/// Register a user directly through the service layer.
#[allow(dead_code)]
pub async fn seed_user(app: &TestApp, username: &str, email: &str, password: &str) -> PublicUser {
    let avatar = StagedFile::write(app.upload_dir.path(), "avatar.png", PNG)
        .await
        .expect("stage avatar");

    app.state
        .credentials
        .register(
            RegisterInput {
                full_name: Some(format!("{} Test", username)),
                email: Some(email.to_string()),
                username: Some(username.to_string()),
                password: Some(password.to_string()),
            },
            RegisterFiles {
                avatar: Some(avatar),
                cover_image: None,
            },
        )
        .await
        .expect("seed user")
}

/// Log in through the service layer and return the access token.
#[allow(dead_code)]
pub async fn access_token_for(app: &TestApp, username: &str, password: &str) -> String {
    let (_, pair) = app
        .state
        .sessions
        .login(videotube_api::services::LoginRequest {
            username: Some(username.to_string()),
            email: None,
            password: Some(password.to_string()),
        })
        .await
        .expect("login");
    pair.access_token
}

/// Build a `multipart/form-data` body: text fields then `(field, filename, bytes)` files.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[allow(dead_code)]
pub fn multipart_request(method: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Number of files left in the upload staging directory.
#[allow(dead_code)]
pub fn staged_file_count(app: &TestApp) -> usize {
    std::fs::read_dir(app.upload_dir.path())
        .map(|entries| entries.count())
        .unwrap_or(0)
}
