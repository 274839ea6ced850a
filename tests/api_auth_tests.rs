// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP tests for registration, login, cookies and protected routes.
//!
//! These tests verify that:
//! 1. Registration responses never leak the password hash or refresh token
//! 2. Login sets HttpOnly + Secure cookies and rotation works via cookie or body
//! 3. Protected routes reject requests without valid tokens
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{
    access_token_for, body_json, create_test_app, find_cookie, json_request, multipart_body,
    multipart_request, seed_user, set_cookie_headers, staged_file_count, PNG,
};

fn register_fields<'a>(username: &'a str, email: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("fullName", "Alice A"),
        ("email", email),
        ("username", username),
        ("password", "p"),
    ]
}

/// Extract the `name=value` pair from a Set-Cookie header.
fn cookie_pair(set_cookie: &str) -> &str {
    set_cookie.split(';').next().unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════
// REGISTER
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_register_returns_sanitized_user() {
    let app = create_test_app();
    let body = multipart_body(
        &register_fields("Alice", "a@x.com"),
        &[("avatar", "a.png", PNG)],
    );

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", "/api/v1/users/register", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["status"], 201);
    assert_eq!(json["message"], "User registered successfully");

    let user = json["data"].as_object().unwrap();
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["fullName"], "Alice A");
    assert!(!user.contains_key("password"));
    assert!(!user.contains_key("passwordHash"));
    assert!(!user.contains_key("refreshToken"));

    assert_eq!(staged_file_count(&app), 0);
}

#[tokio::test]
async fn test_register_without_avatar_returns_400() {
    let app = create_test_app();
    let body = multipart_body(&register_fields("alice", "a@x.com"), &[]);

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", "/api/v1/users/register", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Avatar file is required");
}

#[tokio::test]
async fn test_register_duplicate_returns_400() {
    let app = create_test_app();
    seed_user(&app, "alice", "a@x.com", "pw123").await;

    let body = multipart_body(
        &register_fields("alice", "new@x.com"),
        &[("avatar", "a.png", PNG)],
    );
    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", "/api/v1/users/register", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], 400);
    assert_eq!(json["message"], "User with email or username already exists");
    assert_eq!(staged_file_count(&app), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// LOGIN
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_login_sets_secure_cookies() {
    let app = create_test_app();
    seed_user(&app, "alice", "a@x.com", "pw123").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            json!({"email": "a@x.com", "password": "pw123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookie_headers(&response);
    for name in ["accessToken", "refreshToken"] {
        let cookie = find_cookie(&cookies, name);
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("Secure"), "{cookie}");
        assert!(cookie.contains("Path=/"), "{cookie}");
    }

    let json = body_json(response).await;
    let data = &json["data"];
    assert!(data["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(data["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(data["user"]["username"], "alice");
    assert!(data["user"].get("refreshToken").is_none());
}

#[tokio::test]
async fn test_login_wrong_password_sets_no_cookies() {
    let app = create_test_app();
    seed_user(&app, "alice", "a@x.com", "pw123").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            json!({"username": "alice", "password": "nope"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie_headers(&response).is_empty());
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid user credentials");
}

#[tokio::test]
async fn test_login_unknown_user_returns_404() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            json!({"username": "ghost", "password": "pw123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ═══════════════════════════════════════════════════════════════════════════
// REFRESH
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_refresh_via_cookie_rotates() {
    let app = create_test_app();
    seed_user(&app, "alice", "a@x.com", "pw123").await;

    let login = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            json!({"username": "alice", "password": "pw123"}),
        ))
        .await
        .unwrap();
    let cookies = set_cookie_headers(&login);
    let refresh_cookie = find_cookie(&cookies, "refreshToken");

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/users/refresh-token")
        .header(header::COOKIE, cookie_pair(&refresh_cookie))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rotated = set_cookie_headers(&response);
    let new_refresh = find_cookie(&rotated, "refreshToken");
    assert_ne!(cookie_pair(&new_refresh), cookie_pair(&refresh_cookie));
    find_cookie(&rotated, "accessToken");

    // Presenting the old cookie again fails.
    let replay = Request::builder()
        .method("POST")
        .uri("/api/v1/users/refresh-token")
        .header(header::COOKIE, cookie_pair(&refresh_cookie))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(replay).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_via_body() {
    let app = create_test_app();
    seed_user(&app, "alice", "a@x.com", "pw123").await;
    let (_, pair) = app
        .state
        .sessions
        .login(videotube_api::services::LoginRequest {
            username: Some("alice".to_string()),
            email: None,
            password: Some("pw123".to_string()),
        })
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/refresh-token",
            json!({"refreshToken": pair.refresh_token.clone()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["accessToken"].is_string());
    assert_ne!(json["data"]["refreshToken"], json!(pair.refresh_token));
}

#[tokio::test]
async fn test_refresh_empty_cookie_falls_back_to_body() {
    let app = create_test_app();
    seed_user(&app, "alice", "a@x.com", "pw123").await;
    let (_, pair) = app
        .state
        .sessions
        .login(videotube_api::services::LoginRequest {
            username: Some("alice".to_string()),
            email: None,
            password: Some("pw123".to_string()),
        })
        .await
        .unwrap();

    let mut request = json_request(
        "POST",
        "/api/v1/users/refresh-token",
        json!({"refreshToken": pair.refresh_token.clone()}),
    );
    request
        .headers_mut()
        .insert(header::COOKIE, "refreshToken=".parse().unwrap());
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_json_returns_error_envelope() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": \"alice\","))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], 400);
    assert!(json["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("Invalid JSON body")));
}

#[tokio::test]
async fn test_missing_content_type_returns_error_envelope() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/users/register")
        .body(Body::from("fullName=alice"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_refresh_without_token_returns_401() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/users/refresh-token")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ═══════════════════════════════════════════════════════════════════════════
// PROTECTED ROUTES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_protected_route_without_token_returns_401() {
    let app = create_test_app();

    let request = Request::builder()
        .uri("/api/v1/users/current-user")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], 401);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token_returns_401() {
    let app = create_test_app();

    let request = Request::builder()
        .uri("/api/v1/users/current-user")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_user_with_bearer_token() {
    let app = create_test_app();
    let alice = seed_user(&app, "alice", "a@x.com", "pw123").await;
    let token = access_token_for(&app, "alice", "pw123").await;

    let request = Request::builder()
        .uri("/api/v1/users/current-user")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], json!(alice.id));
    assert!(json["data"].get("refreshToken").is_none());
}

#[tokio::test]
async fn test_current_user_with_cookie() {
    let app = create_test_app();
    seed_user(&app, "alice", "a@x.com", "pw123").await;
    let token = access_token_for(&app, "alice", "pw123").await;

    let request = Request::builder()
        .uri("/api/v1/users/current-user")
        .header(header::COOKIE, format!("accessToken={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookies_and_session() {
    let app = create_test_app();
    let alice = seed_user(&app, "alice", "a@x.com", "pw123").await;
    let token = access_token_for(&app, "alice", "pw123").await;

    for _ in 0..2 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users/logout")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookie_headers(&response);
        assert!(find_cookie(&cookies, "accessToken").contains("Max-Age=0"));
        assert!(find_cookie(&cookies, "refreshToken").contains("Max-Age=0"));
    }

    let stored = app.state.db.get_user(&alice.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_change_password_over_http() {
    let app = create_test_app();
    seed_user(&app, "alice", "a@x.com", "pw123").await;
    let token = access_token_for(&app, "alice", "pw123").await;

    let mut request = json_request(
        "POST",
        "/api/v1/users/change-password",
        json!({"oldPassword": "wrong", "newPassword": "pw456"}),
    );
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = json_request(
        "POST",
        "/api/v1/users/change-password",
        json!({"oldPassword": "pw123", "newPassword": "pw456"}),
    );
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ═══════════════════════════════════════════════════════════════════════════
// HEALTH / CORS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_app();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_cors_preflight_allows_client_with_credentials() {
    let app = create_test_app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/users/login")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let app = create_test_app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/users/login")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_cors_rejects_lookalike_localhost_origins() {
    let app = create_test_app();

    for origin in [
        "http://localhost.evil.com",
        "http://localhost:5173.evil.com",
        "http://127.0.0.1.evil.com",
        "http://localhost:3000",
    ] {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/users/login")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none(),
            "origin {origin} was allowed"
        );
    }
}
