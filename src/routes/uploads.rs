//! Photo upload route.

use axum::Json;
use axum::extract::{Multipart, State};

use crate::error::ApiError;
use crate::services::upload::{self, StoredUpload};
use crate::state::AppState;

const PHOTO_FIELD: &str = "photo";

/// `POST /api/upload`: multipart field `photo`.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StoredUpload>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            break;
        }
        let stored = upload::store_upload(&state.uploads, &original, content_type.as_deref(), &bytes).await?;
        return Ok(Json(stored));
    }
    Err(ApiError::bad_request("No file uploaded"))
}
