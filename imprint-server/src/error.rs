//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imprint_core::ImprintError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication error with specific error code
    #[error("{message}")]
    AuthError { message: String, code: String },

    /// Imprint core error
    #[error("Imprint error: {0}")]
    Imprint(#[from] ImprintError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an authentication error with a specific error code
    pub fn auth_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthError { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            // Registry backend failures → 503, never "no match"
            Self::Imprint(e) if e.is_undetermined() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Imprint(e) => match e {
                // Client-provided invalid input → 400
                ImprintError::DecodeError(_)
                | ImprintError::InvalidDigest(_)
                | ImprintError::InvalidFingerprint(_)
                | ImprintError::InvalidMetadata(_) => StatusCode::BAD_REQUEST,

                ImprintError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                ImprintError::CapacityExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,

                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::AuthError { .. } => "AUTH_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Imprint(e) => match e {
                ImprintError::DecodeError(_) => "DECODE_ERROR",
                ImprintError::EncodeError(_) => "ENCODE_ERROR",
                ImprintError::InvalidDigest(_) => "INVALID_DIGEST",
                ImprintError::InvalidFingerprint(_) => "INVALID_FINGERPRINT",
                ImprintError::InvalidMetadata(_) => "INVALID_METADATA",
                ImprintError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
                ImprintError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
                ImprintError::CorruptSnapshot(_) => "REGISTRY_CORRUPT",
                e if e.is_undetermined() => "REGISTRY_UNAVAILABLE",
                _ => "INTERNAL_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Imprint(e) => match e {
                ImprintError::DecodeError(_) => "Could not decode image".to_string(),
                ImprintError::PayloadTooLarge { size, max } => {
                    format!("Watermark payload of {size} bytes exceeds maximum of {max} bytes")
                }
                ImprintError::CapacityExceeded { needed, capacity } => format!(
                    "Image too small for watermark: needs {needed} bits, capacity is {capacity} bits"
                ),
                ImprintError::InvalidDigest(_)
                | ImprintError::InvalidFingerprint(_)
                | ImprintError::InvalidMetadata(_) => e.to_string(),
                ImprintError::CorruptSnapshot(_) => {
                    "Registry snapshot is corrupt; check result undetermined".to_string()
                }
                e if e.is_undetermined() => {
                    "Registry unavailable; check result undetermined".to_string()
                }
                _ => "Internal processing error".to_string(),
            },
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::AuthError { .. } => "auth_error",
            Self::NotFound(_) => "not_found",
            Self::Imprint(_) => "imprint",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                client_message = %client_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
