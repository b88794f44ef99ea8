//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on request parsing and status mapping.
//! Catalog rows (users, beds, plants, conversations, feedback) are plain
//! free functions over `&PgPool`; the assistant talks to them through the
//! [`catalog::Catalog`] trait so it can run against an in-memory store.

pub mod assistant;
pub mod bed;
pub mod catalog;
pub mod conversation;
pub mod feedback;
pub mod plant;
pub mod upload;
pub mod user;

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("{0}")]
    Validation(String),
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("stored conversation is not valid JSON: {0}")]
    CorruptConversation(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

impl crate::error::ErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::Validation(_) => "E_VALIDATION",
            Self::EmailTaken(_) => "E_EMAIL_TAKEN",
            Self::CorruptConversation(_) => "E_CORRUPT_CONVERSATION",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)))
    }
}

/// Reject blank required text fields.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{field} is required")));
    }
    Ok(())
}

// =============================================================================
// PATCH FIELDS
// =============================================================================

/// Deserialize a nullable patch field: absent → `None`, `null` →
/// `Some(None)`, value → `Some(Some(v))`. Pair with `#[serde(default)]`.
pub(crate) fn patch_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
