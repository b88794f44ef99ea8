//! Plant photo identification route.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::plantid::Identification;
use crate::services::upload;
use crate::state::AppState;

pub const NOT_CONFIGURED: &str = "Plant identification service not configured. Please add PLANTID_API_KEY.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub base64_image: Option<String>,
    /// Counted against the caller's rate limit when present.
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

/// `POST /api/identify-plant`: forward a photo to the identification
/// provider and return its JSON, plus a `topSuggestion` hint.
pub async fn identify_plant(
    State(state): State<AppState>,
    body: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(identifier) = state.identifier.clone() else {
        return Err(ApiError::unavailable(NOT_CONFIGURED));
    };
    let Json(body) = body?;

    if let Some(user_id) = body.user_id {
        state.rate_limiter.check_and_record(user_id)?;
    }

    let image = match (body.base64_image.filter(|b| !b.trim().is_empty()), body.image_url) {
        (Some(b64), _) => b64,
        (None, Some(url)) if !url.trim().is_empty() => {
            let bytes = upload::read_upload(&state.uploads, &url).await.map_err(|e| match e {
                upload::UploadError::Io(_) => ApiError::bad_request(format!("image not found: {url}")),
                other => other.into(),
            })?;
            STANDARD.encode(bytes)
        }
        _ => return Err(ApiError::bad_request("base64Image or imageUrl is required")),
    };

    let mut json = identifier.identify(&image).await?;
    let summary = Identification::from_response(&json);
    if let (Some(top), Some(object)) = (summary.top(), json.as_object_mut()) {
        let mut hint = serde_json::to_value(top).unwrap_or_default();
        if let (Some(percent), Some(hint)) = (summary.top_confidence_percent(), hint.as_object_mut()) {
            hint.insert("confidence".into(), percent.into());
        }
        object.insert("topSuggestion".into(), hint);
    }
    Ok(Json(json))
}
