// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! VideoTube API: accounts, sessions and channel views for a video platform.
//!
//! This crate provides user registration, cookie/bearer token sessions
//! with refresh-token rotation, profile updates with hosted images, and
//! read-only channel and watch-history aggregates.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{
    CredentialService, ImageHostClient, ProfileAggregator, ProfileService, SessionManager,
    TokenService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub credentials: CredentialService,
    pub sessions: SessionManager,
    pub profiles: ProfileService,
    pub channels: ProfileAggregator,
}

impl AppState {
    /// Wire every service to the same database and image host.
    pub fn new(config: Config, db: Database, images: ImageHostClient) -> Self {
        let tokens = TokenService::new(&config);

        Self {
            credentials: CredentialService::new(db.clone(), images.clone()),
            sessions: SessionManager::new(db.clone(), tokens),
            profiles: ProfileService::new(db.clone(), images),
            channels: ProfileAggregator::new(db.clone()),
            config,
            db,
        }
    }
}
