//! Server configuration parsed from environment variables.
//!
//! `main` loads `.env` (via `dotenvy`) before calling [`ServerConfig::from_env`].
//! Provider settings live next to their clients (`llm::config`,
//! `plantid::PlantIdConfig`) since both are optional.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_CHAT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_CHAT_HISTORY_LIMIT: usize = 40;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL required")]
    MissingDatabaseUrl,
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

/// Parse `key` as `T`, falling back to `default` when unset or malformed.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Chat turn tuning shared by the assistant service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    pub max_tokens: u32,
    /// Prior messages replayed to the model, newest kept.
    pub history_limit: usize,
}

impl ChatConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_tokens: env_parse("CHAT_MAX_TOKENS", DEFAULT_CHAT_MAX_TOKENS),
            history_limit: env_parse("CHAT_HISTORY_LIMIT", DEFAULT_CHAT_HISTORY_LIMIT),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_tokens: DEFAULT_CHAT_MAX_TOKENS, history_limit: DEFAULT_CHAT_HISTORY_LIMIT }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub chat: ChatConfig,
}

impl ServerConfig {
    /// # Errors
    ///
    /// Returns an error when `DATABASE_URL` is unset or `PORT` is not a port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };
        let uploads_dir = std::env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOADS_DIR));

        Ok(Self {
            database_url,
            port,
            uploads_dir,
            upload_max_bytes: env_parse("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES),
            chat: ChatConfig::from_env(),
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
