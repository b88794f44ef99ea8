//! User profile routes.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::parse_uuid;
use crate::error::ApiError;
use crate::services::user::{self, NewUser, User};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FindUserQuery {
    pub email: Option<String>,
}

/// `POST /api/users`: register a user.
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(body) = body?;
    let user = user::create_user(&state.pool, &body).await?;
    tracing::info!(user_id = %user.id, "user created");
    Ok(Json(user))
}

/// `GET /api/users/:id`.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<User>, ApiError> {
    let id = parse_uuid("id", Some(&id))?;
    user::get_user(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// `GET /api/users?email=`: look a user up by email.
pub async fn find_user(
    State(state): State<AppState>,
    query: Result<Query<FindUserQuery>, QueryRejection>,
) -> Result<Json<User>, ApiError> {
    let Query(query) = query?;
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("email is required"))?;
    user::get_user_by_email(&state.pool, email)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}
