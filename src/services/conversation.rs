//! Per-user chat history.
//!
//! DESIGN
//! ======
//! The message list is stored as a JSON-encoded text column and decoded on
//! load. A user has at most one live conversation in practice: chat turns
//! read the most recently updated row and rewrite its message list.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::CatalogError;
use crate::llm::types::Role;

const CONVERSATION_COLUMNS: &str = "id, user_id, messages, context, created_at, last_updated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
}

impl StoredMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub messages: Vec<StoredMessage>,
    pub context: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    user_id: Uuid,
    messages: String,
    context: Option<String>,
    created_at: OffsetDateTime,
    last_updated: OffsetDateTime,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = CatalogError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            messages: decode_messages(&row.messages)?,
            context: row.context,
            created_at: row.created_at,
            last_updated: row.last_updated,
        })
    }
}

/// Decode the stored message column. A blank column is an empty history.
pub(crate) fn decode_messages(raw: &str) -> Result<Vec<StoredMessage>, CatalogError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

fn encode_messages(messages: &[StoredMessage]) -> Result<String, CatalogError> {
    Ok(serde_json::to_string(messages)?)
}

// =============================================================================
// QUERIES
// =============================================================================

/// Most recently updated conversation for a user.
///
/// # Errors
///
/// Returns a database error, or `CorruptConversation` when the stored
/// messages do not decode.
pub async fn latest_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Conversation>, CatalogError> {
    let row = sqlx::query_as::<_, ConversationRow>(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations
         WHERE user_id = $1
         ORDER BY last_updated DESC
         LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(Conversation::try_from).transpose()
}

/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_conversation(
    pool: &PgPool,
    user_id: Uuid,
    messages: &[StoredMessage],
    context: Option<&str>,
) -> Result<Conversation, CatalogError> {
    let row = sqlx::query_as::<_, ConversationRow>(&format!(
        "INSERT INTO conversations (user_id, messages, context)
         VALUES ($1, $2, $3)
         RETURNING {CONVERSATION_COLUMNS}"
    ))
    .bind(user_id)
    .bind(encode_messages(messages)?)
    .bind(context)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// Replace a conversation's message list and bump `last_updated`.
///
/// # Errors
///
/// Returns `NotFound` when the conversation is gone, or a database error.
pub async fn update_messages(
    pool: &PgPool,
    id: Uuid,
    messages: &[StoredMessage],
) -> Result<Conversation, CatalogError> {
    let row = sqlx::query_as::<_, ConversationRow>(&format!(
        "UPDATE conversations SET messages = $2, last_updated = now()
         WHERE id = $1
         RETURNING {CONVERSATION_COLUMNS}"
    ))
    .bind(id)
    .bind(encode_messages(messages)?)
    .fetch_optional(pool)
    .await?
    .ok_or(CatalogError::NotFound { kind: "conversation", id })?;

    row.try_into()
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
