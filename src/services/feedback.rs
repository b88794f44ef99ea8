//! User feedback submissions.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CatalogError, require_text};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub message: String,
    /// JSON array of `/uploads/...` URLs.
    pub image_urls: Option<String>,
    pub user_agent: Option<String>,
    pub page_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewFeedback {
    pub user_id: Option<Uuid>,
    pub message: String,
    pub image_urls: Vec<String>,
    pub user_agent: Option<String>,
    pub page_url: Option<String>,
}

/// Encode image URLs for storage; no images stores NULL.
pub(crate) fn encode_image_urls(urls: &[String]) -> Result<Option<String>, CatalogError> {
    if urls.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(urls)?))
}

/// # Errors
///
/// Returns `Validation` for a blank message, or a database error.
pub async fn create_feedback(pool: &PgPool, new: &NewFeedback) -> Result<Feedback, CatalogError> {
    require_text("message", &new.message)?;

    let feedback = sqlx::query_as::<_, Feedback>(
        "INSERT INTO feedback (user_id, message, image_urls, user_agent, page_url)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, user_id, message, image_urls, user_agent, page_url, created_at",
    )
    .bind(new.user_id)
    .bind(new.message.trim())
    .bind(encode_image_urls(&new.image_urls)?)
    .bind(&new.user_agent)
    .bind(&new.page_url)
    .fetch_one(pool)
    .await?;
    Ok(feedback)
}
