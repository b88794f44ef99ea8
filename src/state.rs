//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the optional AI providers, the in-memory
//! rate limiter and the upload/chat settings read at startup.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{ChatConfig, ServerConfig};
use crate::llm::LlmChat;
use crate::plantid::PlantIdentifier;
use crate::rate_limit::RateLimiter;
use crate::services::upload::UploadConfig;

/// Shared application state. Clone is required by Axum; every field is
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Optional LLM client. `None` when no provider key is configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    /// Optional identification client. `None` without `PLANTID_API_KEY`.
    pub identifier: Option<Arc<dyn PlantIdentifier>>,
    /// In-memory rate limiter for chat and identification requests.
    pub rate_limiter: RateLimiter,
    pub uploads: UploadConfig,
    pub chat: ChatConfig,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, uploads: UploadConfig) -> Self {
        Self {
            pool,
            llm: None,
            identifier: None,
            rate_limiter: RateLimiter::default(),
            uploads,
            chat: ChatConfig::default(),
        }
    }

    /// State for a server started from [`ServerConfig`].
    #[must_use]
    pub fn from_config(pool: PgPool, config: &ServerConfig) -> Self {
        let uploads = UploadConfig { dir: config.uploads_dir.clone(), max_bytes: config.upload_max_bytes };
        Self::new(pool, uploads).with_chat(config.chat)
    }

    #[must_use]
    pub fn with_llm(mut self, llm: Option<Arc<dyn LlmChat>>) -> Self {
        self.llm = llm;
        self
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: Option<Arc<dyn PlantIdentifier>>) -> Self {
        self.identifier = identifier;
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    #[must_use]
    pub fn with_chat(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
