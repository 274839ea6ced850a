// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod channel;
pub mod credentials;
pub mod image_host;
pub mod password;
pub mod profile;
pub mod session;
pub mod tokens;

pub use channel::ProfileAggregator;
pub use credentials::{CredentialService, RegisterFiles, RegisterInput};
pub use image_host::{ImageHostClient, StagedFile, UploadedImage};
pub use profile::{ImageSlot, ProfileService, UpdateAccountRequest};
pub use session::{LoginRequest, SessionManager};
pub use tokens::{AccessClaims, RefreshClaims, TokenPair, TokenService};
