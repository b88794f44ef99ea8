//! Plant photo identification via the plant.id v3 API.
//!
//! DESIGN
//! ======
//! `PlantIdentifier` is the seam handlers use, so route tests can stub the
//! provider. `PlantIdClient` posts one base64 image with a location hint to
//! `<base>/identification` and hands back the provider JSON untouched; the
//! typed [`Identification`] summary is only read for logging and hints.
//!
//! SYSTEM CONTEXT
//! ==============
//! The client is optional. Without `PLANTID_API_KEY` the app state carries
//! `None` and the identify route answers 503.

mod summary;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::env_parse;

pub use summary::Identification;

pub const DEFAULT_PLANTID_BASE_URL: &str = "https://plant.id/api/v3";
pub const DEFAULT_LATITUDE: f64 = 49.207;
pub const DEFAULT_LONGITUDE: f64 = 16.608;
const DEFAULT_PLANTID_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PlantIdError {
    #[error("missing API key: env var PLANTID_API_KEY not set")]
    MissingApiKey,
    #[error("identification request failed: {0}")]
    Request(String),
    #[error("Plant.id API error: status {status} - {body}")]
    Response { status: u16, body: String },
    #[error("identification response parse failed: {0}")]
    Parse(String),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for PlantIdError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "E_PLANTID_NOT_CONFIGURED",
            Self::Request(_) => "E_PLANTID_REQUEST",
            Self::Response { .. } => "E_PLANTID_RESPONSE",
            Self::Parse(_) => "E_PLANTID_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PlantIdConfig {
    pub api_key: String,
    pub base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timeout_secs: u64,
}

impl PlantIdConfig {
    /// Read `PLANTID_API_KEY`, `PLANTID_BASE_URL`, `PLANTID_LATITUDE` and
    /// `PLANTID_LONGITUDE`.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` when the key is unset or blank.
    pub fn from_env() -> Result<Self, PlantIdError> {
        let api_key = std::env::var("PLANTID_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(PlantIdError::MissingApiKey)?;
        let base_url = std::env::var("PLANTID_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_PLANTID_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            api_key,
            base_url,
            latitude: env_parse("PLANTID_LATITUDE", DEFAULT_LATITUDE),
            longitude: env_parse("PLANTID_LONGITUDE", DEFAULT_LONGITUDE),
            timeout_secs: DEFAULT_PLANTID_TIMEOUT_SECS,
        })
    }
}

// =============================================================================
// IDENTIFIER TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait PlantIdentifier: Send + Sync {
    /// Identify the plant in a base64-encoded photo and return the raw
    /// provider JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`PlantIdError`] when the provider cannot be reached or
    /// rejects the request.
    async fn identify(&self, base64_image: &str) -> Result<serde_json::Value, PlantIdError>;
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct PlantIdClient {
    http: reqwest::Client,
    config: PlantIdConfig,
}

impl PlantIdClient {
    /// # Errors
    ///
    /// Returns an error if config is missing or the HTTP client fails to build.
    pub fn from_env() -> Result<Self, PlantIdError> {
        Self::new(PlantIdConfig::from_env()?)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: PlantIdConfig) -> Result<Self, PlantIdError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PlantIdError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/identification", self.config.base_url)
    }
}

#[derive(serde::Serialize)]
struct IdentificationRequest<'a> {
    images: [&'a str; 1],
    latitude: f64,
    longitude: f64,
    similar_images: bool,
}

pub(crate) fn build_request(config: &PlantIdConfig, base64_image: &str) -> serde_json::Value {
    serde_json::to_value(IdentificationRequest {
        images: [base64_image],
        latitude: config.latitude,
        longitude: config.longitude,
        similar_images: true,
    })
    .unwrap_or_default()
}

#[async_trait::async_trait]
impl PlantIdentifier for PlantIdClient {
    async fn identify(&self, base64_image: &str) -> Result<serde_json::Value, PlantIdError> {
        info!(image_len = base64_image.len(), "plantid: sending identification request");

        let response = self
            .http
            .post(self.endpoint())
            .header("Api-Key", &self.config.api_key)
            .json(&build_request(&self.config, base64_image))
            .send()
            .await
            .map_err(|e| PlantIdError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PlantIdError::Request(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %text, "plantid: provider error");
            return Err(PlantIdError::Response { status: status.as_u16(), body: text });
        }

        let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| PlantIdError::Parse(e.to_string()))?;
        let summary = Identification::from_response(&json);
        info!(
            is_plant = ?summary.is_plant,
            top = ?summary.top().map(|s| &s.name),
            suggestions = summary.suggestions.len(),
            "plantid: identification complete"
        );
        Ok(json)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
