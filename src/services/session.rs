// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login, logout, refresh-token rotation and password changes.
//!
//! A session is `Anonymous -> Authenticated` on login, back to `Anonymous`
//! on logout, and `Authenticated -> Authenticated` on refresh. Refresh
//! always mints a new pair and overwrites the stored refresh token, so the
//! presented token can only be used once.

use crate::db::Database;
use crate::error::AppError;
use crate::models::PublicUser;
use crate::services::credentials::non_blank;
use crate::services::password::{hash_password, verify_password};
use crate::services::tokens::{TokenPair, TokenService};
use crate::time_utils::now_rfc3339;
use serde::Deserialize;
use subtle::ConstantTimeEq;

/// Login request body. Either identifier may be used.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    tokens: TokenService,
}

impl SessionManager {
    pub fn new(db: Database, tokens: TokenService) -> Self {
        Self { db, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn login(&self, request: LoginRequest) -> Result<(PublicUser, TokenPair), AppError> {
        let username = non_blank(request.username.as_deref()).map(str::to_lowercase);
        let email = non_blank(request.email.as_deref()).map(str::to_lowercase);

        if username.is_none() && email.is_none() {
            return Err(AppError::Validation(
                "Username or email is required".to_string(),
            ));
        }
        let password = match request.password.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => return Err(AppError::Validation("Password is required".to_string())),
        };

        let user = self
            .db
            .find_user_by_identity(username.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::Unauthorized(
                "Invalid user credentials".to_string(),
            ));
        }

        let pair = self.tokens.issue_pair(&user)?;
        self.db
            .update_refresh_token(&user.id, Some(&pair.refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        let mut user = user;
        user.refresh_token = None;
        Ok((user.into(), pair))
    }

    /// Clear the stored refresh token. Safe to call repeatedly.
    pub async fn logout(&self, user_id: &str) -> Result<(), AppError> {
        self.db.update_refresh_token(user_id, None).await?;
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new pair.
    pub async fn refresh(&self, incoming: Option<&str>) -> Result<TokenPair, AppError> {
        let incoming = non_blank(incoming)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

        let claims = self.tokens.verify_refresh_token(incoming)?;

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| {
                AppError::Unauthorized("Refresh token is expired or used".to_string())
            })?;

        let matches_stored = user
            .refresh_token
            .as_deref()
            .map(|stored| bool::from(stored.as_bytes().ct_eq(incoming.as_bytes())))
            .unwrap_or(false);

        if !matches_stored {
            tracing::warn!(user_id = %user.id, "Refresh token reuse or revoked token presented");
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        let pair = self.tokens.issue_pair(&user)?;
        self.db
            .update_refresh_token(&user.id, Some(&pair.refresh_token))
            .await?;

        tracing::debug!(user_id = %user.id, "Rotated session tokens");
        Ok(pair)
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<(), AppError> {
        let (Some(old_password), Some(new_password)) = (
            old_password.filter(|p| !p.trim().is_empty()),
            new_password.filter(|p| !p.trim().is_empty()),
        ) else {
            return Err(AppError::Validation(
                "Old and new password are required".to_string(),
            ));
        };

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(old_password, &user.password_hash) {
            return Err(AppError::Unauthorized("Invalid old password".to_string()));
        }

        let new_hash = hash_password(new_password)?;
        self.db
            .update_password(user_id, &new_hash, &now_rfc3339())
            .await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }
}
