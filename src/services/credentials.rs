// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User registration.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{PublicUser, User};
use crate::services::image_host::{ImageHostClient, StagedFile};
use crate::services::password::hash_password;
use crate::time_utils::now_rfc3339;
use validator::Validate;

/// Registration form fields. Any of them may be missing from the request.
#[derive(Debug, Default, Clone, Validate)]
pub struct RegisterInput {
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 64))]
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Files attached to a registration request.
#[derive(Debug, Default)]
pub struct RegisterFiles {
    pub avatar: Option<StagedFile>,
    pub cover_image: Option<StagedFile>,
}

#[derive(Clone)]
pub struct CredentialService {
    db: Database,
    images: ImageHostClient,
}

/// Return the trimmed value, or `None` if missing or whitespace-only.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl CredentialService {
    pub fn new(db: Database, images: ImageHostClient) -> Self {
        Self { db, images }
    }

    /// Register a new user.
    ///
    /// Staged files are consumed; whatever is not uploaded is removed from
    /// disk when this returns.
    pub async fn register(
        &self,
        input: RegisterInput,
        files: RegisterFiles,
    ) -> Result<PublicUser, AppError> {
        let (Some(full_name), Some(email), Some(username), Some(_)) = (
            non_blank(input.full_name.as_deref()),
            non_blank(input.email.as_deref()),
            non_blank(input.username.as_deref()),
            non_blank(input.password.as_deref()),
        ) else {
            return Err(AppError::Validation("All fields are required".to_string()));
        };
        // Trimming is only for the blank check; the password is hashed as sent.
        let password = input.password.as_deref().unwrap_or_default();

        let username = username.to_lowercase();
        let email = email.to_lowercase();

        let normalized = RegisterInput {
            email: Some(email.clone()),
            username: Some(username.clone()),
            ..Default::default()
        };
        if let Err(errors) = normalized.validate() {
            tracing::debug!(errors = %errors, "Registration input rejected");
            return Err(AppError::Validation(
                "Email or username is not valid".to_string(),
            ));
        }

        if self
            .db
            .find_user_by_identity(Some(&username), Some(&email))
            .await?
            .is_some()
        {
            tracing::info!(username = %username, "Registration rejected: identity taken");
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let RegisterFiles {
            avatar,
            cover_image,
        } = files;

        let Some(avatar) = avatar else {
            return Err(AppError::Validation("Avatar file is required".to_string()));
        };

        let avatar = self
            .images
            .upload_image(avatar)
            .await
            .ok_or_else(|| AppError::Validation("Avatar file is required".to_string()))?;

        let cover_image = match cover_image {
            Some(file) => self.images.upload_image(file).await,
            None => None,
        };

        let now = now_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            full_name: full_name.to_string(),
            password_hash: hash_password(password)?,
            avatar: avatar.url,
            cover_image: cover_image.map(|c| c.url),
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.create_user(&user).await?;

        let created = self.db.get_user(&user.id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Something went wrong while registering the user"
            ))
        })?;

        tracing::info!(user_id = %created.id, username = %created.username, "User registered");

        Ok(created.into())
    }
}
