//! Database layer (Firestore, or in-memory for local runs and tests).

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use crate::error::AppError;
use crate::models::{Subscription, User, Video};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Claim documents keyed by SHA-256 hex of the lowercase username
    pub const USERNAMES: &str = "usernames";
    /// Claim documents keyed by SHA-256 hex of the lowercase email
    pub const EMAILS: &str = "emails";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const VIDEOS: &str = "videos";
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(Arc<MemoryStore>),
}

/// Database handle shared by all services.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

impl Database {
    pub async fn firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreStore::connect(project_id).await?),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user(id).await,
            Backend::Memory(db) => Ok(db.get_user(id)),
        }
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user_by_username(username).await,
            Backend::Memory(db) => Ok(db.get_user_by_username(username)),
        }
    }

    /// Find a user whose username OR email matches.
    pub async fn find_user_by_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }
        match &self.backend {
            Backend::Firestore(db) => db.find_user_by_identity(username, email).await,
            Backend::Memory(db) => Ok(db.find_user_by_identity(username, email)),
        }
    }

    /// Insert a new user. Fails with `Conflict` if the username or email is taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.create_user(user).await,
            Backend::Memory(db) => db.create_user(user),
        }
    }

    /// Set or clear the stored refresh token without touching any other field.
    pub async fn update_refresh_token(
        &self,
        id: &str,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.update_refresh_token(id, token).await,
            Backend::Memory(db) => {
                db.update_refresh_token(id, token);
                Ok(())
            }
        }
    }

    pub async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        now: &str,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.update_password(id, password_hash, now).await,
            Backend::Memory(db) => {
                db.update_password(id, password_hash, now);
                Ok(())
            }
        }
    }

    pub async fn update_account_details(
        &self,
        current: &User,
        full_name: &str,
        email: &str,
        now: &str,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => {
                db.update_account_details(current, full_name, email, now)
                    .await
            }
            Backend::Memory(db) => db.update_account_details(current, full_name, email, now),
        }
    }

    pub async fn update_avatar(&self, id: &str, url: &str, now: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.update_avatar(id, url, now).await,
            Backend::Memory(db) => {
                db.update_avatar(id, url, now);
                Ok(())
            }
        }
    }

    pub async fn update_cover_image(&self, id: &str, url: &str, now: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.update_cover_image(id, url, now).await,
            Backend::Memory(db) => {
                db.update_cover_image(id, url, now);
                Ok(())
            }
        }
    }

    /// Append a video to the user's watch history.
    pub async fn push_watch_history(&self, id: &str, video_id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.push_watch_history(id, video_id).await,
            Backend::Memory(db) => {
                db.push_watch_history(id, video_id);
                Ok(())
            }
        }
    }

    // ─── Subscriptions ───────────────────────────────────────────

    pub async fn put_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.put_subscription(subscription).await,
            Backend::Memory(db) => {
                db.put_subscription(subscription);
                Ok(())
            }
        }
    }

    pub async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.count_subscribers(channel_id).await,
            Backend::Memory(db) => Ok(db.count_subscribers(channel_id)),
        }
    }

    pub async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.count_subscriptions(subscriber_id).await,
            Backend::Memory(db) => Ok(db.count_subscriptions(subscriber_id)),
        }
    }

    pub async fn is_subscribed(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.is_subscribed(subscriber_id, channel_id).await,
            Backend::Memory(db) => Ok(db.is_subscribed(subscriber_id, channel_id)),
        }
    }

    // ─── Videos ──────────────────────────────────────────────────

    pub async fn put_video(&self, video: &Video) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.put_video(video).await,
            Backend::Memory(db) => {
                db.put_video(video);
                Ok(())
            }
        }
    }

    pub async fn get_video(&self, id: &str) -> Result<Option<Video>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_video(id).await,
            Backend::Memory(db) => Ok(db.get_video(id)),
        }
    }
}
