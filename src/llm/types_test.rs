use super::*;
use crate::error::ErrorCode;

fn response(content: Vec<ContentBlock>) -> ChatResponse {
    ChatResponse { content, model: "mock".into(), stop_reason: "end_turn".into(), input_tokens: 12, output_tokens: 30 }
}

// =============================================================================
// LlmError
// =============================================================================

#[test]
fn error_codes_are_stable() {
    assert_eq!(LlmError::ConfigParse("bad".into()).error_code(), "E_CONFIG_PARSE");
    assert_eq!(LlmError::MissingApiKey { var: "K".into() }.error_code(), "E_MISSING_API_KEY");
    assert_eq!(LlmError::ApiRequest("timeout".into()).error_code(), "E_API_REQUEST");
    assert_eq!(LlmError::ApiResponse { status: 500, body: String::new() }.error_code(), "E_API_RESPONSE");
    assert_eq!(LlmError::ApiParse("json".into()).error_code(), "E_API_PARSE");
    assert_eq!(LlmError::HttpClientBuild("tls".into()).error_code(), "E_HTTP_CLIENT_BUILD");
}

#[test]
fn throttling_and_server_errors_are_retryable() {
    assert!(LlmError::ApiRequest("conn refused".into()).retryable());
    assert!(LlmError::ApiResponse { status: 429, body: String::new() }.retryable());
    assert!(LlmError::ApiResponse { status: 503, body: String::new() }.retryable());
}

#[test]
fn client_errors_are_not_retryable() {
    assert!(!LlmError::ApiResponse { status: 400, body: String::new() }.retryable());
    assert!(!LlmError::ApiResponse { status: 401, body: String::new() }.retryable());
    assert!(!LlmError::MissingApiKey { var: "GEMINI_API_KEY".into() }.retryable());
    assert!(!LlmError::ApiParse("json".into()).retryable());
}

#[test]
fn missing_api_key_names_the_variable() {
    let err = LlmError::MissingApiKey { var: "GEMINI_API_KEY".into() };
    assert!(err.to_string().contains("GEMINI_API_KEY"));
}

// =============================================================================
// Wire shapes
// =============================================================================

#[test]
fn role_serializes_lowercase() {
    let msg = Message::assistant("hello");
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["content"], "hello");
}

#[test]
fn stored_history_entry_deserializes_as_text() {
    let msg: Message = serde_json::from_str(r#"{"role":"user","content":"I planted basil"}"#).unwrap();
    assert_eq!(msg.role, Role::User);
    assert!(matches!(msg.content, Content::Text(ref t) if t == "I planted basil"));
}

#[test]
fn unknown_block_type_deserializes_as_unknown() {
    let block: ContentBlock = serde_json::from_str(r#"{"type": "some_future_type", "data": 123}"#).unwrap();
    assert!(matches!(block, ContentBlock::Unknown));
}

#[test]
fn tool_result_omits_absent_error_flag() {
    let block = ContentBlock::ToolResult { tool_use_id: "tu_2".into(), content: "ok".into(), is_error: None };
    let json = serde_json::to_string(&block).unwrap();
    assert!(!json.contains("is_error"));
}

// =============================================================================
// ChatResponse helpers
// =============================================================================

#[test]
fn text_joins_non_empty_text_blocks() {
    let resp = response(vec![
        ContentBlock::Text { text: "Added basil.".into() },
        ContentBlock::Text { text: "   ".into() },
        ContentBlock::Text { text: "Anything else?".into() },
    ]);
    assert_eq!(resp.text().as_deref(), Some("Added basil.\nAnything else?"));
}

#[test]
fn text_is_none_for_tool_only_response() {
    let resp = response(vec![ContentBlock::ToolUse {
        id: "call_0".into(),
        name: "remove_bed".into(),
        input: serde_json::json!({"bedName": "herbs"}),
    }]);
    assert!(resp.text().is_none());
}

#[test]
fn first_tool_call_returns_name_and_input() {
    let resp = response(vec![
        ContentBlock::Text { text: "Sure".into() },
        ContentBlock::ToolUse { id: "a".into(), name: "add_plants".into(), input: serde_json::json!({"bedName": "x"}) },
        ContentBlock::ToolUse { id: "b".into(), name: "remove_bed".into(), input: serde_json::json!({}) },
    ]);
    let (name, input) = resp.first_tool_call().unwrap();
    assert_eq!(name, "add_plants");
    assert_eq!(input["bedName"], "x");
}

#[test]
fn total_tokens_sums_usage() {
    assert_eq!(response(vec![]).total_tokens(), 42);
}
