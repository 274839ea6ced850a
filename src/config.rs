//! Application configuration loaded from environment variables.
//!
//! Everything the service needs at runtime, including the image host
//! credentials, is read once at startup and passed around explicitly.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseMode {
    Firestore,
    Memory,
}

/// Credentials for the hosted image service.
#[derive(Debug, Clone)]
pub struct ImageHostConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend origin allowed by CORS
    pub client_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub database_mode: DatabaseMode,
    /// Directory where uploaded files are staged before forwarding
    pub upload_dir: PathBuf,
    /// Body limit for multipart routes
    pub max_upload_bytes: usize,
    pub access_token_expiry: Duration,
    pub refresh_token_expiry: Duration,

    // --- Secrets ---
    /// HS256 key for access tokens
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens
    pub refresh_token_secret: Vec<u8>,
    pub image_host: ImageHostConfig,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            client_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8000,
            database_mode: DatabaseMode::Memory,
            upload_dir: env::temp_dir().join("videotube-uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            access_token_expiry: Duration::from_secs(24 * 60 * 60),
            refresh_token_expiry: Duration::from_secs(10 * 24 * 60 * 60),
            access_token_secret: b"test_access_key_32_bytes_minimum!".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
            image_host: ImageHostConfig {
                cloud_name: "test-cloud".to_string(),
                api_key: "test_api_key".to_string(),
                api_secret: "test_api_secret".to_string(),
            },
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let database_mode = match env::var("DATABASE_MODE")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => DatabaseMode::Firestore,
            "memory" => DatabaseMode::Memory,
            _ => return Err(ConfigError::Invalid("DATABASE_MODE")),
        };

        Ok(Self {
            client_url: env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT"))?,
            database_mode,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public/temp")),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("MAX_UPLOAD_BYTES"))?,
            access_token_expiry: parse_expiry(
                &env::var("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|_| "1d".to_string()),
            )
            .ok_or(ConfigError::Invalid("ACCESS_TOKEN_EXPIRY"))?,
            refresh_token_expiry: parse_expiry(
                &env::var("REFRESH_TOKEN_EXPIRY").unwrap_or_else(|_| "10d".to_string()),
            )
            .ok_or(ConfigError::Invalid("REFRESH_TOKEN_EXPIRY"))?,

            access_token_secret: required("ACCESS_TOKEN_SECRET")?.into_bytes(),
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?.into_bytes(),
            image_host: ImageHostConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Parse an expiry like `15m`, `1d` or `3600` (seconds).
pub fn parse_expiry(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        _ => (raw, 's'),
    };

    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };

    value
        .checked_mul(multiplier)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
