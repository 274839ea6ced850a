// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Current-user profile reads and updates.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{PublicUser, User};
use crate::services::credentials::non_blank;
use crate::services::image_host::{ImageHostClient, StagedFile};
use crate::time_utils::now_rfc3339;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Which image slot an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Avatar,
    CoverImage,
}

impl ImageSlot {
    fn label(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "avatar",
            ImageSlot::CoverImage => "cover image",
        }
    }
}

#[derive(Clone)]
pub struct ProfileService {
    db: Database,
    images: ImageHostClient,
}

impl ProfileService {
    pub fn new(db: Database, images: ImageHostClient) -> Self {
        Self { db, images }
    }

    pub async fn current_user(&self, user_id: &str) -> Result<PublicUser, AppError> {
        Ok(self.load(user_id).await?.into())
    }

    pub async fn update_account_details(
        &self,
        user_id: &str,
        request: UpdateAccountRequest,
    ) -> Result<PublicUser, AppError> {
        let (Some(full_name), Some(email)) = (
            non_blank(request.full_name.as_deref()),
            non_blank(request.email.as_deref()),
        ) else {
            return Err(AppError::Validation("All fields are required".to_string()));
        };
        let email = email.to_lowercase();

        let normalized = UpdateAccountRequest {
            full_name: None,
            email: Some(email.clone()),
        };
        if normalized.validate().is_err() {
            return Err(AppError::Validation("Email is not valid".to_string()));
        }

        let current = self.load(user_id).await?;
        self.db
            .update_account_details(&current, full_name, &email, &now_rfc3339())
            .await?;

        tracing::info!(user_id, "Account details updated");
        self.current_user(user_id).await
    }

    /// Replace the avatar or cover image with an uploaded file.
    pub async fn update_image(
        &self,
        user_id: &str,
        slot: ImageSlot,
        file: Option<StagedFile>,
    ) -> Result<PublicUser, AppError> {
        let file = file.ok_or_else(|| {
            AppError::Validation(format!("{} file is missing", capitalize(slot.label())))
        })?;

        // Make sure the user exists before paying for an upload.
        self.load(user_id).await?;

        let uploaded = self.images.upload_image(file).await.ok_or_else(|| {
            AppError::Validation(format!("Error while uploading {}", slot.label()))
        })?;

        let now = now_rfc3339();
        match slot {
            ImageSlot::Avatar => self.db.update_avatar(user_id, &uploaded.url, &now).await?,
            ImageSlot::CoverImage => {
                self.db
                    .update_cover_image(user_id, &uploaded.url, &now)
                    .await?
            }
        }

        tracing::info!(user_id, slot = slot.label(), "Profile image updated");
        self.current_user(user_id).await
    }

    async fn load(&self, user_id: &str) -> Result<User, AppError> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
