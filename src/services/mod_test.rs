use super::*;
use crate::error::ErrorCode;

#[derive(Debug, Deserialize)]
struct Probe {
    #[serde(default, deserialize_with = "patch_field")]
    notes: Option<Option<String>>,
}

#[test]
fn patch_field_distinguishes_absent_null_and_value() {
    let absent: Probe = serde_json::from_str("{}").unwrap();
    assert_eq!(absent.notes, None);

    let cleared: Probe = serde_json::from_str(r#"{"notes": null}"#).unwrap();
    assert_eq!(cleared.notes, Some(None));

    let set: Probe = serde_json::from_str(r#"{"notes": "mulch in spring"}"#).unwrap();
    assert_eq!(set.notes, Some(Some("mulch in spring".into())));
}

#[test]
fn require_text_rejects_blank() {
    assert!(require_text("bedName", "Herbs").is_ok());
    let err = require_text("bedName", "   ").unwrap_err();
    assert_eq!(err.to_string(), "bedName is required");
    assert_eq!(err.error_code(), "E_VALIDATION");
}

#[test]
fn catalog_error_codes() {
    let id = Uuid::nil();
    assert_eq!(CatalogError::NotFound { kind: "bed", id }.error_code(), "E_NOT_FOUND");
    assert_eq!(CatalogError::EmailTaken("a@b.c".into()).error_code(), "E_EMAIL_TAKEN");
    assert!(CatalogError::Database(sqlx::Error::PoolTimedOut).retryable());
    assert!(!CatalogError::Database(sqlx::Error::RowNotFound).retryable());
}
