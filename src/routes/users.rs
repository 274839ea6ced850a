// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User account, session and channel routes under `/api/v1/users`.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_auth, AuthUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::models::{ApiResponse, ChannelProfile, PublicUser, WatchedVideo};
use crate::services::{
    ImageSlot, LoginRequest, RegisterFiles, RegisterInput, StagedFile, TokenPair,
    UpdateAccountRequest,
};
use crate::AppState;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let public = Router::new()
        .route("/register", post(register).layer(upload_limit))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar).layer(upload_limit))
        .route("/cover-image", patch(update_cover_image).layer(upload_limit))
        .route("/c/{username}", get(channel_profile))
        .route("/history", get(watch_history))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new().merge(public).merge(protected)
}

// ─── Cookies ─────────────────────────────────────────────────

fn session_cookie(name: &'static str, value: String, ttl: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}

fn with_session_cookies(jar: CookieJar, state: &AppState, pair: &TokenPair) -> CookieJar {
    let tokens = state.sessions.tokens();
    jar.add(session_cookie(
        ACCESS_COOKIE,
        pair.access_token.clone(),
        tokens.access_ttl(),
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        pair.refresh_token.clone(),
        tokens.refresh_ttl(),
    ))
}

/// Expire both session cookies, whether or not the request carried them.
///
/// Removal cookies must match the attributes they were set with.
fn without_session_cookies(jar: CookieJar) -> CookieJar {
    let removal = |name: &'static str| {
        let mut cookie = Cookie::build((name, ""))
            .path("/")
            .http_only(true)
            .secure(true)
            .build();
        cookie.make_removal();
        cookie
    };
    jar.add(removal(ACCESS_COOKIE)).add(removal(REFRESH_COOKIE))
}

// ─── Multipart ───────────────────────────────────────────────

/// Text fields and staged files from a multipart body.
#[derive(Default)]
struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, StagedFile>,
}

impl UploadForm {
    fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}

/// Read the whole multipart body, staging parts named in `file_fields`.
///
/// Empty file parts are treated as absent.
async fn read_upload_form(
    state: &AppState,
    mut multipart: Multipart,
    file_fields: &[&str],
) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if file_fields.contains(&name.as_str()) {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field.bytes().await.map_err(bad_form)?;
            if bytes.is_empty() {
                continue;
            }
            let staged =
                StagedFile::write(&state.config.upload_dir, &original_name, &bytes).await?;
            form.files.insert(name, staged);
        } else {
            let value = field.text().await.map_err(bad_form)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

// ─── Registration & Session ──────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    let mut form = read_upload_form(&state, multipart, &["avatar", "coverImage"]).await?;

    let input = RegisterInput {
        full_name: form.text("fullName"),
        email: form.text("email"),
        username: form.text("username"),
        password: form.text("password"),
    };
    let files = RegisterFiles {
        avatar: form.take_file("avatar"),
        cover_image: form.take_file("coverImage"),
    };

    let user = state.credentials.register(input, files).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: PublicUser,
    access_token: String,
    refresh_token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let (user, pair) = state.sessions.login(request).await?;
    let jar = with_session_cookies(jar, &state, &pair);

    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>)> {
    state.sessions.logout(&user.user_id).await?;
    Ok((
        without_session_cookies(jar),
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    ))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: Option<String>,
}

/// Refresh token comes from the cookie, or from a JSON body for bearer clients.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenPair>)> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshBody>(&body)
            .map_err(|_| AppError::Validation("Invalid JSON body".to_string()))?
            .refresh_token
    };

    // An empty cookie falls through to the body.
    let incoming = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.trim().is_empty())
        .or(from_body);

    let pair = state.sessions.refresh(incoming.as_deref()).await?;
    let jar = with_session_cookies(jar, &state, &pair);

    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: Option<String>,
    new_password: Option<String>,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(request), _): WithRejection<Json<ChangePasswordRequest>, AppError>,
) -> Result<ApiResponse<serde_json::Value>> {
    state
        .sessions
        .change_password(
            &user.user_id,
            request.old_password.as_deref(),
            request.new_password.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

// ─── Profile ─────────────────────────────────────────────────

async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<PublicUser>> {
    let profile = state.profiles.current_user(&user.user_id).await?;
    Ok(ApiResponse::ok(profile, "Current user fetched successfully"))
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateAccountRequest>, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    let profile = state
        .profiles
        .update_account_details(&user.user_id, request)
        .await?;
    Ok(ApiResponse::ok(profile, "Account details updated successfully"))
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    let mut form = read_upload_form(&state, multipart, &["avatar"]).await?;
    let profile = state
        .profiles
        .update_image(&user.user_id, ImageSlot::Avatar, form.take_file("avatar"))
        .await?;
    Ok(ApiResponse::ok(profile, "Avatar updated successfully"))
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    let mut form = read_upload_form(&state, multipart, &["coverImage"]).await?;
    let profile = state
        .profiles
        .update_image(
            &user.user_id,
            ImageSlot::CoverImage,
            form.take_file("coverImage"),
        )
        .await?;
    Ok(ApiResponse::ok(profile, "Cover image updated successfully"))
}

// ─── Channel & History ───────────────────────────────────────

async fn channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>> {
    let profile = state
        .channels
        .get_channel_profile(&user.user_id, &username)
        .await?;
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<WatchedVideo>>> {
    let history = state.channels.get_watch_history(&user.user_id).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
