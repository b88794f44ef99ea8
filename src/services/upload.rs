//! Photo storage on local disk.
//!
//! DESIGN
//! ======
//! Uploaded images are written flat into the uploads directory under a
//! collision-resistant name `<unix-millis>-<random>-<sanitized name>` and
//! served back by `ServeDir` at `/uploads/<name>`. URLs handed back to the
//! identification route are mapped to files only when they name a single
//! plain file inside that directory.

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distr::Alphanumeric;
use time::OffsetDateTime;

pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const MAX_FILES_PER_REQUEST: usize = 5;
pub const UPLOADS_URL_PREFIX: &str = "/uploads/";
const RANDOM_SUFFIX_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only image files (JPEG, PNG, GIF, WebP) are allowed, got {0}")]
    UnsupportedType(String),
    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("too many files: at most {limit} per request")]
    TooManyFiles { limit: usize },
    #[error("not an uploaded file: {0}")]
    InvalidPath(String),
    #[error("upload storage failed: {0}")]
    Io(#[from] std::io::Error),
}

impl crate::error::ErrorCode for UploadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedType(_) => "E_UNSUPPORTED_TYPE",
            Self::TooLarge { .. } => "E_TOO_LARGE",
            Self::TooManyFiles { .. } => "E_TOO_MANY_FILES",
            Self::InvalidPath(_) => "E_INVALID_UPLOAD_PATH",
            Self::Io(_) => "E_UPLOAD_IO",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

/// A file written to the uploads directory.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredUpload {
    pub url: String,
    pub filename: String,
}

/// Keep the last path component and replace anything outside
/// `[A-Za-z0-9._-]` with `_`.
#[must_use]
pub fn sanitize_filename(original: &str) -> String {
    let last = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() { "upload".to_string() } else { cleaned.to_string() }
}

/// Unique on-disk name for an upload.
#[must_use]
pub fn stored_name(original: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{millis}-{suffix}-{}", sanitize_filename(original))
}

/// Check MIME type and size before anything touches disk.
///
/// # Errors
///
/// Returns `UnsupportedType` or `TooLarge`.
pub fn validate(config: &UploadConfig, content_type: Option<&str>, size: usize) -> Result<(), UploadError> {
    let mime = content_type.unwrap_or_default().trim().to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        let shown = if mime.is_empty() { "unknown type".to_string() } else { mime };
        return Err(UploadError::UnsupportedType(shown));
    }
    if size > config.max_bytes {
        return Err(UploadError::TooLarge { size, limit: config.max_bytes });
    }
    Ok(())
}

/// Validate and write one file.
///
/// # Errors
///
/// Returns a validation error or an I/O error from the write.
pub async fn store_upload(
    config: &UploadConfig,
    original_name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<StoredUpload, UploadError> {
    validate(config, content_type, bytes.len())?;
    tokio::fs::create_dir_all(&config.dir).await?;

    let filename = stored_name(original_name);
    tokio::fs::write(config.dir.join(&filename), bytes).await?;
    tracing::info!(%filename, size = bytes.len(), "upload stored");

    Ok(StoredUpload { url: format!("{UPLOADS_URL_PREFIX}{filename}"), filename })
}

/// Map `/uploads/<name>` back to its file.
///
/// # Errors
///
/// Returns `InvalidPath` for URLs outside the uploads prefix or names that
/// are not a single plain file component.
pub fn resolve_upload_url(config: &UploadConfig, url: &str) -> Result<PathBuf, UploadError> {
    let name = url
        .trim()
        .strip_prefix(UPLOADS_URL_PREFIX)
        .ok_or_else(|| UploadError::InvalidPath(url.to_string()))?;
    let is_plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|f| f == name);
    if !is_plain {
        return Err(UploadError::InvalidPath(url.to_string()));
    }
    Ok(config.dir.join(name))
}

/// Read back a previously uploaded file by URL.
///
/// # Errors
///
/// Returns `InvalidPath` for a bad URL and `Io` when the file is missing.
pub async fn read_upload(config: &UploadConfig, url: &str) -> Result<Vec<u8>, UploadError> {
    let path = resolve_upload_url(config, url)?;
    Ok(tokio::fs::read(path).await?)
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
