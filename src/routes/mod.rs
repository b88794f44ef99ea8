//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api`, serves stored photos from
//! `/uploads`, and maps service errors onto HTTP statuses. CORS is wide open
//! for the browser client.

pub mod beds;
pub mod chat;
pub mod feedback;
pub mod identify;
pub mod plants;
pub mod uploads;
pub mod users;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::plantid::PlantIdError;
use crate::rate_limit::RateLimitError;
use crate::services::CatalogError;
use crate::services::assistant::AssistantError;
use crate::services::upload::{MAX_FILES_PER_REQUEST, UploadError};
use crate::state::AppState;

/// Headroom over the file payload for multipart framing and text fields.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state
        .uploads
        .max_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(BODY_LIMIT_SLACK);
    let uploads_dir = state.uploads.dir.clone();

    Router::new()
        .route("/api/users", get(users::find_user).post(users::create_user))
        .route("/api/users/{id}", get(users::get_user))
        .route("/api/beds", get(beds::list_beds).post(beds::create_bed))
        .route(
            "/api/beds/{id}",
            get(beds::get_bed)
                .patch(beds::update_bed)
                .delete(beds::delete_bed),
        )
        .route("/api/plants", get(plants::list_plants).post(plants::create_plant))
        .route(
            "/api/plants/{id}",
            get(plants::get_plant)
                .patch(plants::update_plant)
                .delete(plants::delete_plant),
        )
        .route("/api/upload", post(uploads::upload_photo))
        .route("/api/identify-plant", post(identify::identify_plant))
        .route("/api/conversations/{user_id}", get(chat::get_conversation))
        .route("/api/chat", post(chat::chat))
        .route("/api/feedback", post(feedback::submit_feedback))
        .route("/healthz", get(healthz))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// REQUEST HELPERS
// =============================================================================

/// Parse a required id from a path or query string.
pub(crate) fn parse_uuid(field: &str, raw: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{field} is required")))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("{field} must be a UUID")))
}

pub(crate) fn success() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "success": true }))
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Validation(_) | CatalogError::EmailTaken(_) => StatusCode::BAD_REQUEST,
            CatalogError::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::CorruptConversation(_) | CatalogError::Database(_) => {
                error!(error = %err, "catalog failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::from_code(status, &err)
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        Self::from_code(StatusCode::TOO_MANY_REQUESTS, &err)
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::EmptyMessage => Self::from_code(StatusCode::BAD_REQUEST, &err),
            AssistantError::RateLimited(e) => e.into(),
            AssistantError::Catalog(e) => e.into(),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let status = match &err {
            UploadError::UnsupportedType(_) | UploadError::TooManyFiles { .. } | UploadError::InvalidPath(_) => {
                StatusCode::BAD_REQUEST
            }
            UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Io(_) => {
                error!(error = %err, "upload storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::from_code(status, &err)
    }
}

impl From<PlantIdError> for ApiError {
    fn from(err: PlantIdError) -> Self {
        let status = match &err {
            PlantIdError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            PlantIdError::Request(_) | PlantIdError::Response { .. } | PlantIdError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            PlantIdError::HttpClientBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::from_code(status, &err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), "E_MULTIPART", err.body_text())
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
