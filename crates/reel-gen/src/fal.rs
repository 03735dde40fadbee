//! fal.ai text-to-image client.
//!
//! One synchronous call to `POST {base}/{model}`, then a download of the
//! first returned image URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GenError, GenResult};

pub const DEFAULT_FAL_BASE: &str = "https://fal.run";
pub const DEFAULT_FAL_MODEL: &str = "fal-ai/flux";
pub const DEFAULT_IMAGE_SIZE: &str = "landscape_4_3";

/// Configuration for the fal.ai client.
#[derive(Debug, Clone)]
pub struct FalConfig {
    /// API key sent as `Authorization: Key <key>`
    pub api_key: String,
    pub api_base: String,
    /// Model path, e.g. `fal-ai/flux`
    pub model: String,
    /// Size preset understood by the model
    pub image_size: String,
    /// Generation request timeout
    pub timeout: Duration,
    /// Image download timeout
    pub download_timeout: Duration,
}

impl FalConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_FAL_BASE.to_string(),
            model: DEFAULT_FAL_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            timeout: Duration::from_secs(300),
            download_timeout: Duration::from_secs(60),
        }
    }

    /// Create config from environment variables. `FAL_KEY` is required.
    pub fn from_env() -> GenResult<Self> {
        let api_key = std::env::var("FAL_KEY")
            .map(|k| k.trim().to_string())
            .unwrap_or_default();
        if api_key.is_empty() {
            return Err(GenError::config("FAL_KEY must be set to generate images"));
        }

        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("FAL_API_BASE") {
            config.api_base = base;
        }
        if let Ok(model) = std::env::var("FAL_MODEL") {
            config.model = model;
        }
        if let Ok(size) = std::env::var("FAL_IMAGE_SIZE") {
            config.image_size = size;
        }
        config.timeout = Duration::from_secs(
            std::env::var("FAL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        );
        config.download_timeout = Duration::from_secs(
            std::env::var("IMAGE_DOWNLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        );

        Ok(config)
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            self.model.trim_matches('/')
        )
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    image_size: &'a str,
    num_images: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: String,
    #[serde(default)]
    content_type: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// Turns a prompt into encoded image bytes.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> GenResult<Vec<u8>>;
}

/// fal.ai-backed image generator.
pub struct FalImageClient {
    http: Client,
    config: FalConfig,
}

impl FalImageClient {
    pub fn new(config: FalConfig) -> GenResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("reelqueue/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GenError::Network)?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> GenResult<Self> {
        Self::new(FalConfig::from_env()?)
    }

    pub fn config(&self) -> &FalConfig {
        &self.config
    }

    /// Request one image and return its URL.
    pub async fn request_image(&self, prompt: &str) -> GenResult<String> {
        let url = self.config.endpoint();
        debug!(endpoint = %url, "Requesting image generation");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Key {}", self.config.api_key))
            .json(&GenerateRequest {
                prompt,
                image_size: &self.config.image_size,
                num_images: 1,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenError::request_failed(status.as_u16(), body));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenError::InvalidResponse(format!("fal response: {}", e)))?;

        let image = body.images.into_iter().next().ok_or(GenError::NoImages)?;
        debug!(url = %image.url, content_type = ?image.content_type, "Image generated");
        Ok(image.url)
    }

    /// Download an image URL, rejecting empty bodies.
    pub async fn download(&self, url: &str) -> GenResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .timeout(self.config.download_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenError::request_failed(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(GenError::EmptyDownload(url.to_string()));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for FalImageClient {
    async fn generate(&self, prompt: &str) -> GenResult<Vec<u8>> {
        let url = self.request_image(prompt).await?;
        let bytes = self.download(&url).await?;
        info!(model = %self.config.model, bytes = bytes.len(), "Downloaded generated image");
        Ok(bytes)
    }
}
