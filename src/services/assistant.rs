//! Chat assistant: user message → LLM → catalog action.
//!
//! DESIGN
//! ======
//! Each chat turn replays the user's saved conversation to the LLM together
//! with the garden tools. The reply is reduced to one [`AssistantAction`]:
//! a function call wins, otherwise the text is read as a JSON action object
//! (code fences allowed), otherwise it is plain chat. The action is applied
//! through the [`Catalog`] seam and the resulting message is appended to
//! the conversation.
//!
//! ERROR HANDLING
//! ==============
//! Provider failures and a missing LLM never fail the request: the user
//! gets a fixed apology and the message is still saved. Only validation,
//! rate limiting and conversation persistence surface as errors.

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::CatalogError;
use super::bed::{GardenBed, NewBed};
use super::catalog::Catalog;
use super::conversation::{self, StoredMessage};
use super::plant::NewPlant;
use super::user;
use crate::config::ChatConfig;
use crate::error::ErrorCode;
use crate::llm::LlmChat;
use crate::llm::tools::garden_tools;
use crate::llm::types::{ChatResponse, Message, Role};
use crate::rate_limit::{RateLimitError, RateLimiter};
use crate::state::AppState;

pub const NOT_CONFIGURED_REPLY: &str = "I'm not fully configured yet (missing Gemini API key), but I've saved \
     your message! You can still browse your garden beds and I'll remember our conversation.";
pub const PROVIDER_ERROR_REPLY: &str = "I'm having trouble connecting to my AI service right now. Could you \
     try again in a moment? Your message has been saved.";
pub const APPLY_ERROR_REPLY: &str = "I'm sorry, I had trouble processing that.";
const CHAT_DEFAULT_REPLY: &str = "Got it!";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ErrorCode for AssistantError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::RateLimited(e) => e.error_code(),
            Self::Catalog(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::EmptyMessage => false,
            Self::RateLimited(e) => e.retryable(),
            Self::Catalog(e) => e.retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantSpec {
    pub common_name: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PlantSpec {
    /// Requested quantity, at least 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn quantity(&self) -> i32 {
        match self.quantity {
            Some(q) if q.is_finite() && q >= 1.0 => q.round().min(f64::from(i32::MAX)) as i32,
            _ => 1,
        }
    }
}

/// Intent extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AssistantAction {
    AddPlants {
        #[serde(default)]
        bed_name: String,
        #[serde(default)]
        plants: Vec<PlantSpec>,
        #[serde(default)]
        response: Option<String>,
    },
    RemovePlants {
        #[serde(default)]
        bed_name: String,
        #[serde(default)]
        plant_names: Vec<String>,
        #[serde(default)]
        response: Option<String>,
    },
    RemoveBed {
        #[serde(default)]
        bed_name: String,
        #[serde(default)]
        response: Option<String>,
    },
    Chat {
        #[serde(default)]
        response: Option<String>,
    },
}

impl AssistantAction {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddPlants { .. } => "add_plants",
            Self::RemovePlants { .. } => "remove_plants",
            Self::RemoveBed { .. } => "remove_bed",
            Self::Chat { .. } => "chat",
        }
    }

    fn response(&self) -> Option<&str> {
        match self {
            Self::AddPlants { response, .. }
            | Self::RemovePlants { response, .. }
            | Self::RemoveBed { response, .. }
            | Self::Chat { response } => response.as_deref().filter(|r| !r.trim().is_empty()),
        }
    }

    /// Catalog actions missing the bed or the plants they act on.
    fn is_incomplete(&self) -> bool {
        match self {
            Self::AddPlants { bed_name, plants, .. } => bed_name.trim().is_empty() || plants.is_empty(),
            Self::RemovePlants { bed_name, plant_names, .. } => bed_name.trim().is_empty() || plant_names.is_empty(),
            Self::RemoveBed { bed_name, .. } => bed_name.trim().is_empty(),
            Self::Chat { .. } => false,
        }
    }

    /// Drop plant entries with blank names so a catalog action is checked
    /// in full before anything is written.
    fn without_blank_names(self) -> Self {
        match self {
            Self::AddPlants { bed_name, mut plants, response } => {
                plants.retain(|p| !p.common_name.trim().is_empty());
                Self::AddPlants { bed_name, plants, response }
            }
            Self::RemovePlants { bed_name, mut plant_names, response } => {
                plant_names.retain(|n| !n.trim().is_empty());
                Self::RemovePlants { bed_name, plant_names, response }
            }
            other => other,
        }
    }

    fn into_chat(self) -> Self {
        Self::Chat { response: self.response().map(str::to_string) }
    }
}

/// A model reply reduced to an action plus the raw text it carried.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub action: AssistantAction,
    pub raw_text: Option<String>,
}

/// What applying an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: String,
    pub kind: &'static str,
    /// Whether the catalog was modified.
    pub changed: bool,
}

/// Body of a `POST /api/chat` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    pub conversation_id: Uuid,
    pub action: &'static str,
    /// Tells the client to reload beds and plants.
    pub changed: bool,
}

// =============================================================================
// PARSING
// =============================================================================

/// Reduce a model reply to an action.
#[must_use]
pub fn parse_action(response: &ChatResponse) -> ParsedReply {
    let raw_text = response.text();

    if let Some((name, input)) = response.first_tool_call() {
        let mut object = match input {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        object.insert("action".into(), serde_json::Value::String(name.to_string()));
        match serde_json::from_value::<AssistantAction>(serde_json::Value::Object(object)) {
            Ok(action) => return ParsedReply { action, raw_text },
            Err(e) => warn!(tool = %name, error = %e, "assistant: unusable tool call, falling back to text"),
        }
    }

    let action = raw_text
        .as_deref()
        .and_then(parse_json_action)
        .unwrap_or(AssistantAction::Chat { response: None });
    ParsedReply { action, raw_text }
}

/// Read a JSON action object out of reply text. An object with an unknown
/// or missing `action` becomes chat carrying its `response`.
fn parse_json_action(text: &str) -> Option<AssistantAction> {
    let body = strip_code_fence(text);
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if !value.is_object() {
        return None;
    }
    match serde_json::from_value::<AssistantAction>(value.clone()) {
        Ok(action) => Some(action),
        Err(_) => {
            let response = value
                .get("response")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            Some(AssistantAction::Chat { response })
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` on the opening fence line.
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

// =============================================================================
// BED MATCHING
// =============================================================================

/// Find a bed by name, ignoring case and surrounding whitespace. When that
/// misses, a trailing " bed" is dropped from the request and the lookup is
/// retried, so "herb garden bed" finds "Herb Garden".
#[must_use]
pub fn find_bed<'a>(beds: &'a [GardenBed], requested: &str) -> Option<&'a GardenBed> {
    let wanted = requested.trim().to_lowercase();
    let matches = |name: &str| beds.iter().find(|b| b.bed_name.trim().to_lowercase() == name);

    matches(wanted.as_str()).or_else(|| {
        let stripped = wanted.strip_suffix("bed")?;
        if !stripped.ends_with(char::is_whitespace) {
            return None;
        }
        let stripped = stripped.trim();
        if stripped.is_empty() { None } else { matches(stripped) }
    })
}

// =============================================================================
// APPLY
// =============================================================================

/// Apply an action to the user's catalog and phrase the reply.
///
/// # Errors
///
/// Returns a catalog error if a create or delete fails.
pub async fn apply_action(
    catalog: &dyn Catalog,
    user_id: Uuid,
    action: AssistantAction,
    raw_text: Option<&str>,
) -> Result<Outcome, CatalogError> {
    let action = action.without_blank_names();
    let action = if action.is_incomplete() { action.into_chat() } else { action };
    let kind = action.kind();
    let response = action.response().map(str::to_string);

    match action {
        AssistantAction::AddPlants { bed_name, plants, .. } => {
            let beds = catalog.beds_for_user(user_id).await?;
            let bed = match find_bed(&beds, &bed_name) {
                Some(bed) => bed.clone(),
                None => catalog.create_bed(&NewBed::named(user_id, bed_name.trim())).await?,
            };
            for spec in &plants {
                catalog
                    .create_plant(&NewPlant {
                        bed_id: bed.id,
                        common_name: spec.common_name.clone(),
                        scientific_name: spec.scientific_name.clone(),
                        quantity: Some(spec.quantity()),
                        notes: spec.notes.clone(),
                        ..NewPlant::default()
                    })
                    .await?;
            }
            info!(%user_id, bed_id = %bed.id, count = plants.len(), "assistant: plants added");
            let message =
                response.unwrap_or_else(|| format!("Added {} plant(s) to \"{bed_name}\"!", plants.len()));
            Ok(Outcome { message, kind, changed: true })
        }
        AssistantAction::RemovePlants { bed_name, plant_names, .. } => {
            let beds = catalog.beds_for_user(user_id).await?;
            let Some(bed) = find_bed(&beds, &bed_name) else {
                return Ok(Outcome {
                    message: format!("I couldn't find a bed called \"{bed_name}\". Could you check the name?"),
                    kind,
                    changed: false,
                });
            };

            let plants = catalog.plants_in_bed(bed.id).await?;
            let mut removed_ids = Vec::new();
            let mut removed_names = Vec::new();
            for wanted in &plant_names {
                let wanted = wanted.trim().to_lowercase();
                let hit = plants
                    .iter()
                    .find(|p| !removed_ids.contains(&p.id) && p.common_name.trim().to_lowercase() == wanted);
                if let Some(plant) = hit {
                    catalog.delete_plant(plant.id).await?;
                    removed_ids.push(plant.id);
                    removed_names.push(plant.common_name.clone());
                }
            }

            if removed_names.is_empty() {
                return Ok(Outcome {
                    message: format!("I couldn't find those plants in \"{bed_name}\". Could you check the names?"),
                    kind,
                    changed: false,
                });
            }
            info!(%user_id, bed_id = %bed.id, count = removed_names.len(), "assistant: plants removed");
            let message = response
                .unwrap_or_else(|| format!("Removed {} from \"{bed_name}\".", removed_names.join(", ")));
            Ok(Outcome { message, kind, changed: true })
        }
        AssistantAction::RemoveBed { bed_name, .. } => {
            let beds = catalog.beds_for_user(user_id).await?;
            let Some(bed) = find_bed(&beds, &bed_name) else {
                let names: Vec<&str> = beds.iter().map(|b| b.bed_name.as_str()).collect();
                let message = if names.is_empty() {
                    format!("I couldn't find a bed called \"{bed_name}\". You don't have any garden beds yet.")
                } else {
                    format!(
                        "I couldn't find a bed called \"{bed_name}\". You have: {}. Could you check the name?",
                        names.join(", ")
                    )
                };
                return Ok(Outcome { message, kind, changed: false });
            };

            let plants = catalog.plants_in_bed(bed.id).await?;
            for plant in &plants {
                catalog.delete_plant(plant.id).await?;
            }
            catalog.delete_bed(bed.id).await?;
            info!(%user_id, bed_id = %bed.id, plants = plants.len(), "assistant: bed removed");
            let message = response
                .unwrap_or_else(|| format!("Deleted the garden bed \"{}\" and all its plants.", bed.bed_name));
            Ok(Outcome { message, kind, changed: true })
        }
        AssistantAction::Chat { .. } => {
            let message = response
                .or_else(|| raw_text.filter(|t| !t.trim().is_empty()).map(str::to_string))
                .unwrap_or_else(|| CHAT_DEFAULT_REPLY.to_string());
            Ok(Outcome { message, kind, changed: false })
        }
    }
}

// =============================================================================
// PROMPT
// =============================================================================

pub(crate) fn build_system_prompt(beds: &[GardenBed]) -> String {
    let mut prompt = String::from(
        "You are a helpful garden assistant that helps users catalog and manage their garden plants.\n\n\
         Use the provided tools to change the catalog:\n\
         - add_plants: the user planted something. Include the bed name and every plant with a quantity.\n\
         - remove_plants: the user removed, pulled, or lost plants from a bed.\n\
         - remove_bed: the user wants an entire bed deleted.\n\
         For questions or conversation, reply with plain text and call no tool.\n\n\
         If tools are unavailable, answer with a single JSON object instead, for example:\n\
         {\"action\": \"add_plants\", \"bedName\": \"herb garden\", \"plants\": [{\"commonName\": \"basil\", \"quantity\": 1}], \"response\": \"...\"}\n\
         {\"action\": \"remove_plants\", \"bedName\": \"herb garden\", \"plantNames\": [\"tomato\"], \"response\": \"...\"}\n\
         {\"action\": \"remove_bed\", \"bedName\": \"vegetable bed\", \"response\": \"...\"}\n\
         {\"action\": \"chat\", \"response\": \"...\"}\n\n\
         Always include a friendly \"response\" for the user.\n\n\
         The user's garden beds:\n",
    );

    if beds.is_empty() {
        prompt.push_str("(none yet)\n");
    } else {
        for bed in beds {
            let _ = write!(prompt, "- {}", bed.bed_name);
            if let Some(sun) = bed.sun_exposure.as_deref() {
                let _ = write!(prompt, " (sun: {sun})");
            }
            prompt.push('\n');
        }
    }
    prompt
}

/// Prior messages replayed to the model: non-empty, newest `limit` kept,
/// followed by the new user message.
pub(crate) fn build_history(prior: &[StoredMessage], message: &str, limit: usize) -> Vec<Message> {
    let usable: Vec<&StoredMessage> = prior.iter().filter(|m| !m.content.trim().is_empty()).collect();
    let start = usable.len().saturating_sub(limit);
    let mut messages: Vec<Message> = usable[start..]
        .iter()
        .map(|m| match m.role {
            Role::User => Message::user(m.content.clone()),
            Role::Assistant => Message::assistant(m.content.clone()),
        })
        .collect();
    messages.push(Message::user(message));
    messages
}

// =============================================================================
// CHAT TURN
// =============================================================================

/// One model round trip plus action application, independent of storage
/// of the conversation itself.
pub(crate) async fn run_turn(
    llm: Option<&dyn LlmChat>,
    catalog: &dyn Catalog,
    rate_limiter: &RateLimiter,
    chat: ChatConfig,
    user_id: Uuid,
    prior: &[StoredMessage],
    message: &str,
) -> Outcome {
    let Some(llm) = llm else {
        return Outcome { message: NOT_CONFIGURED_REPLY.to_string(), kind: "chat", changed: false };
    };

    let beds = match catalog.beds_for_user(user_id).await {
        Ok(beds) => beds,
        Err(e) => {
            warn!(%user_id, error = %e, "assistant: could not load beds for prompt");
            Vec::new()
        }
    };
    let system = build_system_prompt(&beds);
    let history = build_history(prior, message, chat.history_limit);
    let tools = garden_tools();

    let response = match llm.chat(chat.max_tokens, &system, &history, Some(&tools)).await {
        Ok(response) => response,
        Err(e) => {
            warn!(%user_id, error = %e, "assistant: LLM request failed");
            return Outcome { message: PROVIDER_ERROR_REPLY.to_string(), kind: "chat", changed: false };
        }
    };
    rate_limiter.record_tokens(user_id, response.total_tokens());

    let parsed = parse_action(&response);
    info!(
        %user_id,
        stop_reason = %response.stop_reason,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        action = parsed.action.kind(),
        "assistant: LLM response"
    );

    let kind = parsed.action.kind();
    let applied = apply_action(catalog, user_id, parsed.action, parsed.raw_text.as_deref()).await;
    match applied {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(%user_id, action = kind, error = %e, "assistant: applying action failed");
            let message = parsed
                .raw_text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| APPLY_ERROR_REPLY.to_string());
            Outcome { message, kind, changed: false }
        }
    }
}

/// Handle `POST /api/chat`.
///
/// # Errors
///
/// Returns `EmptyMessage`, `RateLimited`, or a catalog error when the
/// conversation cannot be loaded or saved.
pub async fn handle_chat(state: &AppState, user_id: Uuid, message: &str) -> Result<ChatReply, AssistantError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AssistantError::EmptyMessage);
    }
    state.rate_limiter.check_and_record(user_id)?;

    info!(%user_id, message_len = message.len(), "assistant: chat turn");
    let existing = conversation::latest_for_user(&state.pool, user_id).await?;
    let mut messages = existing.as_ref().map(|c| c.messages.clone()).unwrap_or_default();

    let outcome = run_turn(
        state.llm.as_deref(),
        &state.pool,
        &state.rate_limiter,
        state.chat,
        user_id,
        &messages,
        message,
    )
    .await;

    messages.push(StoredMessage::user(message));
    messages.push(StoredMessage::assistant(outcome.message.clone()));

    let saved = match existing {
        Some(convo) => conversation::update_messages(&state.pool, convo.id, &messages).await?,
        None => conversation::create_conversation(&state.pool, user_id, &messages, None).await?,
    };

    if let Err(e) = user::touch_last_active(&state.pool, user_id).await {
        warn!(%user_id, error = %e, "assistant: failed to touch last_active");
    }

    Ok(ChatReply {
        message: outcome.message,
        conversation_id: saved.id,
        action: outcome.kind,
        changed: outcome.changed,
    })
}

#[cfg(test)]
#[path = "assistant_test.rs"]
mod tests;
