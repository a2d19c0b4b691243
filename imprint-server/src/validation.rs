//! Request validation module
//!
//! Upload checks plus parsing of digests and fingerprints received as text.

use imprint_core::{ContentDigest, PerceptualFingerprint};

use crate::error::ApiError;

/// Allowed MIME type categories for image uploads
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "application/octet-stream"];

/// Default max file size in bytes (25 MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Validates the Content-Type of an uploaded file
///
/// Accepts `image/*` and `application/octet-stream`. A missing Content-Type is
/// treated as binary; the decoder has the final say.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{ct}'. Allowed types: image/*, application/octet-stream"
                )))
            }
        }
        None => Ok(()),
    }
}

/// Validates the size of an uploaded file
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size == 0 {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if size > max_size {
        return Err(ApiError::bad_request(format!(
            "File too large: {} bytes exceeds maximum of {} bytes",
            size, max_size
        )));
    }
    Ok(())
}

/// Parse a hex digest from a path segment or JSON field.
pub fn parse_digest(raw: &str) -> Result<ContentDigest, ApiError> {
    Ok(ContentDigest::parse(raw)?)
}

/// Parse an optional hex fingerprint; empty strings count as absent.
pub fn parse_fingerprint(raw: Option<&str>) -> Result<Option<PerceptualFingerprint>, ApiError> {
    match raw.map(str::trim) {
        Some(hex) if !hex.is_empty() => Ok(Some(PerceptualFingerprint::from_hex(hex)?)),
        _ => Ok(None),
    }
}
