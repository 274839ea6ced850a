// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted image service client (Cloudinary upload API).
//!
//! Uploaded form files are first staged on local disk as a [`StagedFile`],
//! then forwarded here. The staged file is always removed once the upload
//! attempt finishes, and a `StagedFile` that is dropped without being
//! uploaded removes itself as well.

use crate::config::ImageHostConfig;
use crate::error::AppError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A form file written to the upload directory.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file_name: String,
}

impl StagedFile {
    /// Write `bytes` to a uniquely named file under `dir`.
    pub async fn write(dir: &Path, original_name: &str, bytes: &[u8]) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create upload dir: {}", e))
        })?;

        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let file_name = format!("{}{}", uuid::Uuid::new_v4(), extension);
        let path = dir.join(&file_name);

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to stage upload: {}", e))
        })?;

        Ok(Self { path, file_name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload")
            }
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

#[derive(Clone)]
enum Mode {
    Live {
        http: reqwest::Client,
        config: ImageHostConfig,
    },
    Mock {
        fail: bool,
    },
}

/// Image host client.
#[derive(Clone)]
pub struct ImageHostClient {
    mode: Mode,
}

impl ImageHostClient {
    pub fn new(config: ImageHostConfig) -> Self {
        Self {
            mode: Mode::Live {
                http: reqwest::Client::new(),
                config,
            },
        }
    }

    /// Offline client that "hosts" every file at a fake URL.
    pub fn new_mock() -> Self {
        Self {
            mode: Mode::Mock { fail: false },
        }
    }

    /// Offline client whose uploads always fail.
    pub fn new_mock_failing() -> Self {
        Self {
            mode: Mode::Mock { fail: true },
        }
    }

    /// Upload a staged file. Returns `None` on any failure.
    ///
    /// The staged file is deleted before this returns.
    pub async fn upload_image(&self, file: StagedFile) -> Option<UploadedImage> {
        let result = match &self.mode {
            Mode::Live { http, config } => upload_to_cloudinary(http, config, &file).await,
            Mode::Mock { fail: false } => Ok(UploadedImage {
                url: format!("https://images.mock.local/{}", file.file_name()),
            }),
            Mode::Mock { fail: true } => Err(AppError::Internal(anyhow::anyhow!(
                "Mock image host rejected upload"
            ))),
        };

        if let Err(e) = tokio::fs::remove_file(file.path()).await {
            tracing::warn!(path = %file.path().display(), error = %e, "Failed to remove staged upload");
        }

        match result {
            Ok(image) => {
                tracing::info!(url = %image.url, "Image uploaded");
                Some(image)
            }
            Err(e) => {
                tracing::error!(file = file.file_name(), error = %e, "Image upload failed");
                None
            }
        }
    }
}

async fn upload_to_cloudinary(
    http: &reqwest::Client,
    config: &ImageHostConfig,
    file: &StagedFile,
) -> Result<UploadedImage, AppError> {
    let bytes = tokio::fs::read(file.path())
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to read staged upload: {}", e)))?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs()
        .to_string();

    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file.file_name().to_string()),
        )
        .text("api_key", config.api_key.clone())
        .text("timestamp", timestamp.clone())
        .text("signature_algorithm", "sha256")
        .text("signature", sign_params(&timestamp, &config.api_secret));

    let url = format!(
        "https://api.cloudinary.com/v1_1/{}/auto/upload",
        config.cloud_name
    );

    let response = http
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Image host request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Internal(anyhow::anyhow!(
            "Image host returned HTTP {}: {}",
            status,
            body
        )));
    }

    let body: CloudinaryUploadResponse = response
        .json()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Bad image host response: {}", e)))?;

    body.secure_url
        .or(body.url)
        .map(|url| UploadedImage { url })
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Image host response had no URL")))
}

/// Signature over the signed parameters (only `timestamp` here).
fn sign_params(timestamp: &str, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("timestamp={}{}", timestamp, api_secret).as_bytes());
    hex::encode(hasher.finalize())
}
