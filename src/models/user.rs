//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User record stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID, also used as document ID
    pub id: String,
    /// Lowercase, unique
    pub username: String,
    /// Lowercase, unique
    pub email: String,
    pub full_name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Avatar URL on the image host
    pub avatar: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Refresh token currently accepted for this user
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Video IDs, oldest first
    #[serde(default)]
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// User as returned by the API: no password hash, no refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image.unwrap_or_default(),
            watch_history: user.watch_history,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Condensed owner info attached to videos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Marker document reserving a username or email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub user_id: String,
}
