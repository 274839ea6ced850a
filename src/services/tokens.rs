// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token issuance.
//!
//! Both tokens are HS256 JWTs, signed with separate keys and carrying
//! separate expiry windows. Decoding failures of any kind map to
//! `AppError::InvalidToken`; whether a refresh token is still the one on
//! record is checked by the session layer.

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Access token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Refresh token claims. Identity only.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    /// Random nonce so two tokens minted in the same second still differ.
    pub jti: String,
}

/// Access + refresh token pair returned on login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenService {
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl: config.access_token_expiry,
            refresh_ttl: config.refresh_token_expiry,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, AppError> {
        let now = unix_now()?;
        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            iat: now,
            exp: now + self.access_ttl.as_secs() as usize,
        };
        sign(&claims, &self.access_secret)
    }

    pub fn issue_refresh_token(&self, user: &User) -> Result<String, AppError> {
        let now = unix_now()?;
        let claims = RefreshClaims {
            sub: user.id.clone(),
            iat: now,
            exp: now + self.refresh_ttl.as_secs() as usize,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        sign(&claims, &self.refresh_secret)
    }

    /// Mint a fresh access/refresh pair.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(user)?,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        verify(token, &self.access_secret)
    }

    /// Check signature and expiry only.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AppError> {
        verify(token, &self.refresh_secret)
    }
}

fn unix_now() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs() as usize)
}

fn sign<T: Serialize>(claims: &T, secret: &[u8]) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

fn verify<T: for<'de> Deserialize<'de>>(token: &str, secret: &[u8]) -> Result<T, AppError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<T>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            AppError::InvalidToken
        })
}
