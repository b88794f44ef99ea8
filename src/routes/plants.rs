//! Plant routes.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::{parse_uuid, success};
use crate::error::ApiError;
use crate::services::CatalogError;
use crate::services::plant::{self, NewPlant, Plant, PlantPatch};
use crate::state::AppState;

const PLANT_NOT_FOUND: &str = "Plant not found";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlantsQuery {
    pub bed_id: Option<String>,
}

/// `GET /api/plants?bedId=`.
pub async fn list_plants(
    State(state): State<AppState>,
    query: Result<Query<ListPlantsQuery>, QueryRejection>,
) -> Result<Json<Vec<Plant>>, ApiError> {
    let Query(query) = query?;
    let bed_id = parse_uuid("bedId", query.bed_id.as_deref())?;
    Ok(Json(plant::list_plants_for_bed(&state.pool, bed_id).await?))
}

/// `GET /api/plants/:id`.
pub async fn get_plant(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Plant>, ApiError> {
    let id = parse_uuid("id", Some(&id))?;
    plant::get_plant(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(PLANT_NOT_FOUND))
}

/// `POST /api/plants`.
pub async fn create_plant(
    State(state): State<AppState>,
    body: Result<Json<NewPlant>, JsonRejection>,
) -> Result<Json<Plant>, ApiError> {
    let Json(body) = body?;
    Ok(Json(plant::create_plant(&state.pool, &body).await?))
}

/// `PATCH /api/plants/:id`.
pub async fn update_plant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PlantPatch>, JsonRejection>,
) -> Result<Json<Plant>, ApiError> {
    let id = parse_uuid("id", Some(&id))?;
    let Json(patch) = body?;
    match plant::update_plant(&state.pool, id, &patch).await {
        Ok(plant) => Ok(Json(plant)),
        Err(CatalogError::NotFound { .. }) => Err(ApiError::not_found(PLANT_NOT_FOUND)),
        Err(e) => Err(e.into()),
    }
}

/// `DELETE /api/plants/:id`. Idempotent.
pub async fn delete_plant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_uuid("id", Some(&id))?;
    plant::delete_plant(&state.pool, id).await?;
    Ok(success())
}
