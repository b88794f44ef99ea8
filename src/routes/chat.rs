//! Chat assistant and conversation history routes.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::ApiError;
use crate::services::assistant::{self, ChatReply};
use crate::services::conversation::{self, Conversation};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub user_id: Uuid,
}

/// `POST /api/chat`: one assistant turn.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = body?;
    let reply = assistant::handle_chat(&state, body.user_id, &body.message).await?;
    Ok(Json(reply))
}

/// `GET /api/conversations/:userId`: the user's latest conversation.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let user_id = parse_uuid("userId", Some(&user_id))?;
    conversation::latest_for_user(&state.pool, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No conversation found"))
}
