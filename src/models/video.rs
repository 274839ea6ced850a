// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Video model and the watch-history view built from it.

use serde::{Deserialize, Serialize};

use super::user::OwnerSummary;

/// Stored video record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Video ID (also used as document ID)
    pub id: String,
    /// Hosted video file URL
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Length in seconds
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default = "default_published")]
    pub is_published: bool,
    /// User ID of the uploader
    pub owner: String,
    pub created_at: String,
}

fn default_published() -> bool {
    true
}

/// A watch-history entry: the video plus a condensed owner.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub id: String,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: u64,
    pub is_published: bool,
    pub created_at: String,
    pub owner: Option<OwnerSummary>,
}

impl WatchedVideo {
    pub fn new(video: Video, owner: Option<OwnerSummary>) -> Self {
        Self {
            id: video.id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            owner,
        }
    }
}
