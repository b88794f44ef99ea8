//! Garden bed routes.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::{parse_uuid, success};
use crate::error::ApiError;
use crate::services::bed::{self, BedPatch, GardenBed, NewBed};
use crate::state::AppState;

const BED_NOT_FOUND: &str = "Garden bed not found";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBedsQuery {
    pub user_id: Option<String>,
}

/// `GET /api/beds?userId=`: a user's beds, most recently edited first.
pub async fn list_beds(
    State(state): State<AppState>,
    query: Result<Query<ListBedsQuery>, QueryRejection>,
) -> Result<Json<Vec<GardenBed>>, ApiError> {
    let Query(query) = query?;
    let user_id = parse_uuid("userId", query.user_id.as_deref())?;
    Ok(Json(bed::list_beds_for_user(&state.pool, user_id).await?))
}

/// `GET /api/beds/:id`.
pub async fn get_bed(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<GardenBed>, ApiError> {
    let id = parse_uuid("id", Some(&id))?;
    bed::get_bed(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(BED_NOT_FOUND))
}

/// `POST /api/beds`.
pub async fn create_bed(
    State(state): State<AppState>,
    body: Result<Json<NewBed>, JsonRejection>,
) -> Result<Json<GardenBed>, ApiError> {
    let Json(body) = body?;
    Ok(Json(bed::create_bed(&state.pool, &body).await?))
}

/// `PATCH /api/beds/:id`: partial update.
pub async fn update_bed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<BedPatch>, JsonRejection>,
) -> Result<Json<GardenBed>, ApiError> {
    let id = parse_uuid("id", Some(&id))?;
    let Json(patch) = body?;
    match bed::update_bed(&state.pool, id, &patch).await {
        Ok(bed) => Ok(Json(bed)),
        Err(crate::services::CatalogError::NotFound { .. }) => Err(ApiError::not_found(BED_NOT_FOUND)),
        Err(e) => Err(e.into()),
    }
}

/// `DELETE /api/beds/:id`: removes the bed and its plants. Idempotent.
pub async fn delete_bed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_uuid("id", Some(&id))?;
    let removed = bed::delete_bed(&state.pool, id).await?;
    tracing::info!(bed_id = %id, removed, "bed delete");
    Ok(success())
}
