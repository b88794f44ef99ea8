use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::*;
use crate::plantid::PlantIdentifier;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::test_helpers;

const BOUNDARY: &str = "garden-test-boundary";

// =========================================================================
// helpers
// =========================================================================

async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, req).await
}

#[derive(Clone, Copy)]
enum Part<'a> {
    Text(&'a str, &'a str),
    File { field: &'a str, filename: &'a str, content_type: &'a str, bytes: &'a [u8] },
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File { field, filename, content_type, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

struct StubIdentifier {
    result: Result<serde_json::Value, (u16, String)>,
    seen: Mutex<Vec<String>>,
}

impl StubIdentifier {
    fn ok(json: serde_json::Value) -> Arc<Self> {
        Arc::new(Self { result: Ok(json), seen: Mutex::new(Vec::new()) })
    }

    fn failing(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self { result: Err((status, body.into())), seen: Mutex::new(Vec::new()) })
    }
}

#[async_trait::async_trait]
impl PlantIdentifier for StubIdentifier {
    async fn identify(&self, base64_image: &str) -> Result<serde_json::Value, PlantIdError> {
        self.seen.lock().unwrap().push(base64_image.to_string());
        self.result
            .clone()
            .map_err(|(status, body)| PlantIdError::Response { status, body })
    }
}

fn basil_result() -> serde_json::Value {
    serde_json::json!({
        "result": {
            "is_plant": { "probability": 0.99 },
            "classification": { "suggestions": [
                { "name": "Ocimum basilicum", "probability": 0.9 }
            ]}
        }
    })
}

// =========================================================================
// basics + validation (no database reached)
// =========================================================================

#[tokio::test]
async fn healthz_ok() {
    let app = app(test_helpers::test_app_state());
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_beds_requires_user_id() {
    let (status, body) = get(app(test_helpers::test_app_state()), "/api/beds").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId is required");
    assert_eq!(body["code"], "E_BAD_REQUEST");

    let (status, body) = get(app(test_helpers::test_app_state()), "/api/beds?userId=not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId must be a UUID");
}

#[tokio::test]
async fn list_plants_requires_bed_id() {
    let (status, body) = get(app(test_helpers::test_app_state()), "/api/plants").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bedId is required");
}

#[tokio::test]
async fn malformed_query_is_coded_bad_request() {
    let (status, body) = get(app(test_helpers::test_app_state()), "/api/users?email=a@x.com&email=b@x.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E_BAD_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn bad_path_id_is_bad_request() {
    let (status, _) = get(app(test_helpers::test_app_state()), "/api/beds/banana").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(app(test_helpers::test_app_state()), "/api/conversations/banana").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/beds")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(test_helpers::test_app_state()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E_BAD_REQUEST");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn create_bed_requires_user_id() {
    let (status, _) =
        post_json(app(test_helpers::test_app_state()), "/api/beds", serde_json::json!({"bedName": "Herbs"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =========================================================================
// chat
// =========================================================================

#[tokio::test]
async fn chat_rejects_empty_message() {
    let body = serde_json::json!({ "userId": Uuid::new_v4(), "message": "   " });
    let (status, json) = post_json(app(test_helpers::test_app_state()), "/api/chat", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Message cannot be empty");
    assert_eq!(json["code"], "E_EMPTY_MESSAGE");
}

#[tokio::test]
async fn chat_requires_user_id() {
    let (status, _) =
        post_json(app(test_helpers::test_app_state()), "/api/chat", serde_json::json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_rate_limit_is_429_and_retryable() {
    let limiter = RateLimiter::new(RateLimitConfig { per_user_limit: 0, ..RateLimitConfig::default() });
    let state = test_helpers::test_app_state().with_rate_limiter(limiter);
    let body = serde_json::json!({ "userId": Uuid::new_v4(), "message": "add basil" });

    let (status, json) = post_json(app(state), "/api/chat", body).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "E_RATE_LIMITED");
    assert_eq!(json["retryable"], true);
}

// =========================================================================
// identify
// =========================================================================

#[tokio::test]
async fn identify_without_key_is_503() {
    let body = serde_json::json!({ "base64Image": "aGk=" });
    let (status, json) = post_json(app(test_helpers::test_app_state()), "/api/identify-plant", body).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], identify::NOT_CONFIGURED);
}

#[tokio::test]
async fn identify_passes_provider_json_through_with_hint() {
    let stub = StubIdentifier::ok(basil_result());
    let state = test_helpers::test_app_state_with_identifier(stub.clone());
    let body = serde_json::json!({ "base64Image": "aGk=" });

    let (status, json) = post_json(app(state), "/api/identify-plant", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["is_plant"]["probability"], 0.99);
    assert_eq!(json["topSuggestion"]["name"], "Ocimum basilicum");
    assert_eq!(json["topSuggestion"]["confidence"], 90);
    assert_eq!(stub.seen.lock().unwrap().as_slice(), ["aGk="]);
}

#[tokio::test]
async fn identify_reads_uploaded_image_by_url() {
    let stub = StubIdentifier::ok(basil_result());
    let state = test_helpers::test_app_state_with_identifier(stub.clone());
    std::fs::create_dir_all(&state.uploads.dir).unwrap();
    std::fs::write(state.uploads.dir.join("1-abc-leaf.png"), b"hi").unwrap();
    let dir = state.uploads.dir.clone();

    let body = serde_json::json!({ "imageUrl": "/uploads/1-abc-leaf.png" });
    let (status, _) = post_json(app(state), "/api/identify-plant", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stub.seen.lock().unwrap().as_slice(), ["aGk="]);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn identify_requires_an_image() {
    let state = test_helpers::test_app_state_with_identifier(StubIdentifier::ok(basil_result()));
    let (status, json) = post_json(app(state), "/api/identify-plant", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "base64Image or imageUrl is required");

    let state = test_helpers::test_app_state_with_identifier(StubIdentifier::ok(basil_result()));
    let body = serde_json::json!({ "imageUrl": "/uploads/../Cargo.toml" });
    let (status, _) = post_json(app(state), "/api/identify-plant", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn identify_provider_error_is_502() {
    let state = test_helpers::test_app_state_with_identifier(StubIdentifier::failing(401, "{\"error\":\"bad key\"}"));
    let body = serde_json::json!({ "base64Image": "aGk=" });
    let (status, json) = post_json(app(state), "/api/identify-plant", body).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "E_PLANTID_RESPONSE");
    assert!(json["error"].as_str().unwrap().contains("401"));
}

// =========================================================================
// uploads + feedback
// =========================================================================

#[tokio::test]
async fn upload_stores_and_serves_photo() {
    let state = test_helpers::test_app_state();
    let dir = state.uploads.dir.clone();
    let router = app(state);

    let req = multipart_request(
        "/api/upload",
        &[Part::File { field: "photo", filename: "my rose.png", content_type: "image/png", bytes: b"petals" }],
    );
    let (status, json) = send(router.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    let url = json["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with("-my_rose.png"));
    assert_eq!(json["filename"].as_str().unwrap(), url.trim_start_matches("/uploads/"));

    let response = router
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"petals");

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn upload_without_photo_is_400() {
    let req = multipart_request("/api/upload", &[Part::Text("note", "hello")]);
    let (status, json) = send(app(test_helpers::test_app_state()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file uploaded");
}

#[tokio::test]
async fn upload_rejects_non_images() {
    let req = multipart_request(
        "/api/upload",
        &[Part::File { field: "photo", filename: "notes.pdf", content_type: "application/pdf", bytes: b"%PDF" }],
    );
    let (status, json) = send(app(test_helpers::test_app_state()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "E_UNSUPPORTED_TYPE");
}

#[tokio::test]
async fn upload_too_large_is_413() {
    let mut state = test_helpers::test_app_state();
    state.uploads.max_bytes = 4;
    let req = multipart_request(
        "/api/upload",
        &[Part::File { field: "photo", filename: "big.jpg", content_type: "image/jpeg", bytes: b"0123456789" }],
    );
    let (status, json) = send(app(state), req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "E_TOO_LARGE");
}

#[tokio::test]
async fn feedback_requires_message() {
    let req = multipart_request("/api/feedback", &[Part::Text("message", "   "), Part::Text("pageUrl", "/beds")]);
    let (status, json) = send(app(test_helpers::test_app_state()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Feedback message is required");
}

#[tokio::test]
async fn feedback_rejects_sixth_image() {
    let image = Part::File { field: "images", filename: "a.png", content_type: "image/png", bytes: b"x" };
    let mut parts = vec![image; 6];
    parts.push(Part::Text("message", "too many pictures"));
    let (status, json) = send(app(test_helpers::test_app_state()), multipart_request("/api/feedback", &parts)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "E_TOO_MANY_FILES");
}

// =========================================================================
// helpers + error mapping
// =========================================================================

#[test]
fn parse_uuid_reports_field() {
    let id = Uuid::new_v4();
    assert_eq!(parse_uuid("bedId", Some(&id.to_string())).unwrap(), id);
    assert_eq!(parse_uuid("bedId", None).unwrap_err().message, "bedId is required");
    assert_eq!(parse_uuid("bedId", Some("  ")).unwrap_err().message, "bedId is required");
    assert_eq!(parse_uuid("bedId", Some("x")).unwrap_err().message, "bedId must be a UUID");
}

#[test]
fn service_errors_map_to_statuses() {
    let not_found = ApiError::from(CatalogError::NotFound { kind: "bed", id: Uuid::nil() });
    assert_eq!(not_found.status, StatusCode::NOT_FOUND);

    let taken = ApiError::from(CatalogError::EmailTaken("a@b.c".into()));
    assert_eq!(taken.status, StatusCode::BAD_REQUEST);
    assert_eq!(taken.code, "E_EMAIL_TAKEN");

    let db = ApiError::from(CatalogError::Database(sqlx::Error::PoolTimedOut));
    assert_eq!(db.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(db.retryable);

    let missing_key = ApiError::from(PlantIdError::MissingApiKey);
    assert_eq!(missing_key.status, StatusCode::SERVICE_UNAVAILABLE);

    let io = ApiError::from(UploadError::Io(std::io::Error::other("disk full")));
    assert_eq!(io.status, StatusCode::INTERNAL_SERVER_ERROR);
}
