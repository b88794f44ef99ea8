//! Feedback submission route.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;

use super::parse_uuid;
use crate::error::ApiError;
use crate::services::feedback::{self, NewFeedback};
use crate::services::upload::{self, MAX_FILES_PER_REQUEST, UploadError};
use crate::state::AppState;

struct PendingImage {
    name: String,
    content_type: Option<String>,
    bytes: axum::body::Bytes,
}

/// `POST /api/feedback`: multipart `message`, optional `userId` and
/// `pageUrl`, up to five `images`.
pub async fn submit_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut message = String::new();
    let mut user_id = None;
    let mut page_url = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => message = field.text().await?,
            "userId" => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    user_id = Some(parse_uuid("userId", Some(&raw))?);
                }
            }
            "pageUrl" => page_url = Some(field.text().await?).filter(|u| !u.trim().is_empty()),
            "images" => {
                if images.len() == MAX_FILES_PER_REQUEST {
                    return Err(UploadError::TooManyFiles { limit: MAX_FILES_PER_REQUEST }.into());
                }
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    images.push(PendingImage { name, content_type, bytes });
                }
            }
            _ => {}
        }
    }

    if message.trim().is_empty() {
        return Err(ApiError::bad_request("Feedback message is required"));
    }
    for image in &images {
        upload::validate(&state.uploads, image.content_type.as_deref(), image.bytes.len())?;
    }

    let mut image_urls = Vec::with_capacity(images.len());
    for image in &images {
        let stored =
            upload::store_upload(&state.uploads, &image.name, image.content_type.as_deref(), &image.bytes).await?;
        image_urls.push(stored.url);
    }

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let saved = feedback::create_feedback(
        &state.pool,
        &NewFeedback { user_id, message, image_urls, user_agent, page_url },
    )
    .await?;
    tracing::info!(feedback_id = %saved.id, images = saved.image_urls.is_some(), "feedback received");

    Ok(Json(serde_json::json!({ "success": true, "feedback": saved })))
}
