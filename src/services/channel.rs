// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only channel and watch-history views.
//!
//! Both are derived per request from the user record, the subscription
//! edges and the video collection. Nothing here is persisted.

use std::collections::HashMap;

use crate::db::Database;
use crate::error::AppError;
use crate::models::{ChannelProfile, OwnerSummary, WatchedVideo};

#[derive(Clone)]
pub struct ProfileAggregator {
    db: Database,
}

impl ProfileAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Public profile of `channel_username` as seen by `viewer_id`.
    pub async fn get_channel_profile(
        &self,
        viewer_id: &str,
        channel_username: &str,
    ) -> Result<ChannelProfile, AppError> {
        let username = channel_username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username is missing".to_string()));
        }
        let username = username.to_lowercase();

        let channel = self
            .db
            .get_user_by_username(&username)
            .await?
            .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))?;

        let subscribers_count = self.db.count_subscribers(&channel.id).await?;
        let channels_subscribed_to_count = self.db.count_subscriptions(&channel.id).await?;
        // Membership is the (viewer -> channel) edge itself.
        let is_subscribed = self.db.is_subscribed(viewer_id, &channel.id).await?;

        tracing::debug!(
            channel_id = %channel.id,
            viewer_id,
            subscribers_count,
            is_subscribed,
            "Built channel profile"
        );

        Ok(ChannelProfile {
            full_name: channel.full_name,
            username: channel.username,
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
            avatar: channel.avatar,
            cover_image: channel.cover_image.unwrap_or_default(),
            email: channel.email,
        })
    }

    /// The viewer's watch history in stored order, with condensed owners.
    ///
    /// Videos that no longer exist are skipped; an owner that no longer
    /// exists is reported as `None`.
    pub async fn get_watch_history(&self, viewer_id: &str) -> Result<Vec<WatchedVideo>, AppError> {
        let viewer = self
            .db
            .get_user(viewer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        let mut owners: HashMap<String, Option<OwnerSummary>> = HashMap::new();
        let mut history = Vec::with_capacity(viewer.watch_history.len());

        for video_id in &viewer.watch_history {
            let Some(video) = self.db.get_video(video_id).await? else {
                tracing::debug!(video_id = %video_id, "Skipping missing video in watch history");
                continue;
            };

            let owner = match owners.get(&video.owner) {
                Some(cached) => cached.clone(),
                None => {
                    let owner = self
                        .db
                        .get_user(&video.owner)
                        .await?
                        .map(|u| OwnerSummary::from(&u));
                    owners.insert(video.owner.clone(), owner.clone());
                    owner
                }
            };

            history.push(WatchedVideo::new(video, owner));
        }

        Ok(history)
    }
}
