//! External image hosting seam.
//!
//! Avatars are stored as externally-hosted URLs only; the upload endpoint
//! pushes the bytes to a host and persists the URL it returns.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Uploads the image and returns its public URL.
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// HTTP client for an image hosting service exposing a multipart
/// `POST /upload` that answers `{"url": "..."}`.
pub struct HttpImageHost {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageHost {
    pub fn new(base_url: String, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        let base_url = base_url.trim_end_matches('/').to_string();

        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("photo")
            .mime_str(content_type)
            .context("Invalid image content type")?;
        let form = reqwest::multipart::Form::new().part("photo", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("Failed to reach the image host")?;

        if !response.status().is_success() {
            bail!("Image upload failed with status: {}", response.status());
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .context("Failed to parse image host response")?;
        Ok(parsed.url)
    }
}
