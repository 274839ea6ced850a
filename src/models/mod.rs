// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod channel;
pub mod response;
pub mod subscription;
pub mod user;
pub mod video;

pub use channel::ChannelProfile;
pub use response::ApiResponse;
pub use subscription::Subscription;
pub use user::{OwnerSummary, PublicUser, User};
pub use video::{Video, WatchedVideo};
