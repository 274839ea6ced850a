// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, partial updates of single fields)
//! - Identity claims (username/email uniqueness)
//! - Subscriptions (channel edges)
//! - Videos (watch-history lookups)

use crate::db::collections;
use crate::error::AppError;
use crate::models::user::IdentityClaim;
use crate::models::{Subscription, User, Video};
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

// Field-masked update payloads. Only the listed fields are written.

#[derive(Serialize, Deserialize)]
struct RefreshTokenPatch {
    refresh_token: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct PasswordPatch {
    password_hash: String,
    updated_at: String,
}

#[derive(Serialize, Deserialize)]
struct AccountPatch {
    full_name: String,
    email: String,
    updated_at: String,
}

#[derive(Serialize, Deserialize)]
struct AvatarPatch {
    avatar: String,
    updated_at: String,
}

#[derive(Serialize, Deserialize)]
struct CoverImagePatch {
    cover_image: Option<String>,
    updated_at: String,
}

#[derive(Serialize, Deserialize)]
struct WatchHistoryPatch {
    watch_history: Vec<String>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn connect(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::connect_emulator(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn connect_emulator(project_id: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await?)
    }

    /// Resolve a username through its claim document.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let claim: Option<IdentityClaim> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::USERNAMES)
            .obj()
            .one(&claim_doc_id(username))
            .await?;

        match claim {
            Some(claim) => self.get_user(&claim.user_id).await,
            None => Ok(None),
        }
    }

    /// Single query matching either the username or the email.
    pub async fn find_user_by_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| {
                q.for_any([
                    username.and_then(|u| q.field("username").eq(u)),
                    email.and_then(|e| q.field("email").eq(e)),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await?;

        Ok(users.into_iter().next())
    }

    /// Create a user, reserving its username and email first.
    ///
    /// A claim that already exists fails with `Conflict`; claims taken
    /// before the failure are released.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.claim(collections::USERNAMES, &user.username, &user.id)
            .await?;

        if let Err(e) = self.claim(collections::EMAILS, &user.email, &user.id).await {
            self.release(collections::USERNAMES, &user.username).await;
            return Err(e);
        }

        let inserted: Result<(), FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await;

        if let Err(e) = inserted {
            self.release(collections::USERNAMES, &user.username).await;
            self.release(collections::EMAILS, &user.email).await;
            return Err(e.into());
        }

        Ok(())
    }

    pub async fn update_refresh_token(
        &self,
        id: &str,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        let patch = RefreshTokenPatch {
            refresh_token: token.map(str::to_string),
        };
        self.patch_user(id, firestore::paths!(RefreshTokenPatch::{refresh_token}), &patch)
            .await
    }

    pub async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        now: &str,
    ) -> Result<(), AppError> {
        let patch = PasswordPatch {
            password_hash: password_hash.to_string(),
            updated_at: now.to_string(),
        };
        self.patch_user(
            id,
            firestore::paths!(PasswordPatch::{password_hash, updated_at}),
            &patch,
        )
        .await
    }

    /// Update name and email, moving the email claim when it changes.
    pub async fn update_account_details(
        &self,
        current: &User,
        full_name: &str,
        email: &str,
        now: &str,
    ) -> Result<(), AppError> {
        let email_changed = email != current.email;
        if email_changed {
            self.claim(collections::EMAILS, email, &current.id).await?;
        }

        let patch = AccountPatch {
            full_name: full_name.to_string(),
            email: email.to_string(),
            updated_at: now.to_string(),
        };
        self.patch_user(
            &current.id,
            firestore::paths!(AccountPatch::{full_name, email, updated_at}),
            &patch,
        )
        .await?;

        if email_changed {
            self.release(collections::EMAILS, &current.email).await;
        }
        Ok(())
    }

    pub async fn update_avatar(&self, id: &str, url: &str, now: &str) -> Result<(), AppError> {
        let patch = AvatarPatch {
            avatar: url.to_string(),
            updated_at: now.to_string(),
        };
        self.patch_user(id, firestore::paths!(AvatarPatch::{avatar, updated_at}), &patch)
            .await
    }

    pub async fn update_cover_image(&self, id: &str, url: &str, now: &str) -> Result<(), AppError> {
        let patch = CoverImagePatch {
            cover_image: Some(url.to_string()),
            updated_at: now.to_string(),
        };
        self.patch_user(
            id,
            firestore::paths!(CoverImagePatch::{cover_image, updated_at}),
            &patch,
        )
        .await
    }

    pub async fn push_watch_history(&self, id: &str, video_id: &str) -> Result<(), AppError> {
        let Some(user) = self.get_user(id).await? else {
            return Ok(());
        };

        let mut watch_history = user.watch_history;
        watch_history.push(video_id.to_string());

        let patch = WatchHistoryPatch { watch_history };
        self.patch_user(id, firestore::paths!(WatchHistoryPatch::{watch_history}), &patch)
            .await
    }

    // ─── Subscription Operations ─────────────────────────────────

    pub async fn put_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::SUBSCRIPTIONS)
            .document_id(subscription.doc_id())
            .object(subscription)
            .execute()
            .await?;
        Ok(())
    }

    /// Number of edges pointing at `channel_id`.
    pub async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError> {
        let edges: Vec<Subscription> = self
            .client
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(|q| q.for_all([q.field("channel").eq(channel_id)]))
            .obj()
            .query()
            .await?;
        Ok(edges.len() as u64)
    }

    /// Number of edges leaving `subscriber_id`.
    pub async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError> {
        let edges: Vec<Subscription> = self
            .client
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(|q| q.for_all([q.field("subscriber").eq(subscriber_id)]))
            .obj()
            .query()
            .await?;
        Ok(edges.len() as u64)
    }

    pub async fn is_subscribed(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, AppError> {
        let edge: Option<Subscription> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::SUBSCRIPTIONS)
            .obj()
            .one(&format!("{}_{}", subscriber_id, channel_id))
            .await?;
        Ok(edge.is_some())
    }

    // ─── Video Operations ────────────────────────────────────────

    pub async fn put_video(&self, video: &Video) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::VIDEOS)
            .document_id(&video.id)
            .object(video)
            .execute()
            .await?;
        Ok(())
    }

    pub async fn get_video(&self, id: &str) -> Result<Option<Video>, AppError> {
        Ok(self
            .client
            .fluent()
            .select()
            .by_id_in(collections::VIDEOS)
            .obj()
            .one(id)
            .await?)
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Write only `fields` of the user document.
    async fn patch_user<T>(&self, id: &str, fields: Vec<String>, patch: &T) -> Result<(), AppError>
    where
        T: Serialize + Sync + Send + for<'de> Deserialize<'de>,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::USERS)
            .document_id(id)
            .object(patch)
            .execute()
            .await?;
        Ok(())
    }

    /// Insert a claim document; an existing one held by another user is a conflict.
    async fn claim(&self, collection: &str, key: &str, user_id: &str) -> Result<(), AppError> {
        let doc_id = claim_doc_id(key);
        let inserted: Result<(), FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(&doc_id)
            .object(&IdentityClaim {
                user_id: user_id.to_string(),
            })
            .execute()
            .await;

        match inserted {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => {
                let holder: Option<IdentityClaim> = self
                    .client
                    .fluent()
                    .select()
                    .by_id_in(collection)
                    .obj()
                    .one(&doc_id)
                    .await?;
                match holder {
                    Some(holder) if holder.user_id == user_id => Ok(()),
                    _ => Err(AppError::Conflict(
                        "User with email or username already exists".to_string(),
                    )),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of a claim document.
    async fn release(&self, collection: &str, key: &str) {
        let result = self
            .client
            .fluent()
            .delete()
            .from(collection)
            .document_id(claim_doc_id(key))
            .execute()
            .await;

        if let Err(e) = result {
            tracing::error!(collection, key, error = %e, "Failed to release identity claim");
        }
    }
}

/// Claim documents are keyed by a digest of the value, since usernames and
/// emails may contain characters Firestore rejects in document ids.
fn claim_doc_id(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}
