//! Google Gemini `generateContent` client.
//!
//! DESIGN
//! ======
//! Gemini speaks `user`/`model` roles and `parts` instead of content blocks,
//! and function calls carry no identifier. Outgoing messages are translated
//! in `build_contents`; incoming calls get synthesized `call_{n}` ids so the
//! rest of the crate can treat every provider alike. Pure translation lives
//! outside the client for testability.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::LlmTimeouts;
use super::types::{ChatResponse, Content, ContentBlock, LlmError, Message, Role, Tool};

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        Ok(Self { http: super::http_client(timeouts)?, api_key, base_url })
    }

    pub async fn chat(
        &self,
        model: &str,
        max_tokens: u32,
        system: &str,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url.trim_end_matches('/'));
        let request = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(max_tokens, system, messages, tools));

        parse_response(&super::send_for_text(request).await?, model)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTools<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTools<'a> {
    function_declarations: Vec<FunctionDeclaration<'a>>,
}

#[derive(Serialize)]
struct FunctionDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    /// Set on thought-summary parts; these never reach callers.
    #[serde(default, skip_serializing)]
    thought: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: UsageMetadata,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

// =============================================================================
// TRANSLATION
// =============================================================================

fn build_request<'a>(
    max_tokens: u32,
    system: &str,
    messages: &[Message],
    tools: Option<&'a [Tool]>,
) -> GenerateRequest<'a> {
    let system_instruction = (!system.trim().is_empty()).then(|| WireContent {
        role: None,
        parts: vec![Part { text: Some(system.to_string()), ..Part::default() }],
    });

    let tools = tools
        .filter(|t| !t.is_empty())
        .map(|t| {
            vec![WireTools {
                function_declarations: t
                    .iter()
                    .map(|tool| FunctionDeclaration {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: &tool.input_schema,
                    })
                    .collect(),
            }]
        })
        .unwrap_or_default();

    GenerateRequest {
        system_instruction,
        contents: build_contents(messages),
        tools,
        generation_config: GenerationConfig { max_output_tokens: max_tokens },
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn build_contents(messages: &[Message]) -> Vec<WireContent> {
    // Gemini function responses are keyed by function name, not call id.
    let mut call_names: HashMap<&str, &str> = HashMap::new();
    let mut out = Vec::with_capacity(messages.len());

    for message in messages {
        let parts = match &message.content {
            Content::Text(text) => vec![Part { text: Some(text.clone()), ..Part::default() }],
            Content::Blocks(blocks) => {
                let mut parts = Vec::new();
                for block in blocks {
                    match block {
                        ContentBlock::Text { text } => {
                            parts.push(Part { text: Some(text.clone()), ..Part::default() });
                        }
                        ContentBlock::ToolUse { id, name, input } => {
                            call_names.insert(id.as_str(), name.as_str());
                            parts.push(Part {
                                function_call: Some(FunctionCall { name: name.clone(), args: input.clone() }),
                                ..Part::default()
                            });
                        }
                        ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                            let name = call_names
                                .get(tool_use_id.as_str())
                                .copied()
                                .unwrap_or(tool_use_id.as_str());
                            let key = if is_error.unwrap_or(false) { "error" } else { "content" };
                            let mut response = serde_json::Map::new();
                            response.insert(key.to_string(), Value::String(content.clone()));
                            parts.push(Part {
                                function_response: Some(FunctionResponse {
                                    name: name.to_string(),
                                    response: Value::Object(response),
                                }),
                                ..Part::default()
                            });
                        }
                        ContentBlock::Thinking { .. } | ContentBlock::Unknown => {}
                    }
                }
                parts
            }
        };

        if !parts.is_empty() {
            out.push(WireContent { role: Some(wire_role(message.role).to_string()), parts });
        }
    }
    out
}

pub(crate) fn parse_response(json: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
    let api: GenerateResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    let Some(candidate) = api.candidates.into_iter().next() else {
        return Err(LlmError::ApiParse("gemini: response has no candidates".to_string()));
    };

    let mut content = Vec::new();
    let mut call_index = 0usize;
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if part.thought {
            continue;
        }
        if let Some(call) = part.function_call {
            content.push(ContentBlock::ToolUse {
                id: format!("call_{call_index}"),
                name: call.name,
                input: if call.args.is_null() { Value::Object(serde_json::Map::default()) } else { call.args },
            });
            call_index += 1;
        } else if let Some(text) = part.text {
            if !text.is_empty() {
                content.push(ContentBlock::Text { text });
            }
        }
    }

    let stop_reason = if call_index > 0 {
        "tool_use"
    } else if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
        "max_tokens"
    } else {
        "end_turn"
    };

    Ok(ChatResponse {
        content,
        model: api.model_version.unwrap_or_else(|| requested_model.to_string()),
        stop_reason: stop_reason.to_string(),
        input_tokens: api.usage_metadata.prompt_token_count,
        output_tokens: api.usage_metadata.candidates_token_count,
    })
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
