//! Admin authentication
//!
//! Admin routes accept `Authorization: Bearer <ADMIN_TOKEN>`. When no admin
//! token is configured the routes are open and a warning is logged per request.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::state::AppState;

/// Marker extractor for requests allowed onto the admin routes.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

fn extract_bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| {
            ApiError::auth_error("AUTH_MISSING_TOKEN", "Missing Authorization header")
        })?;

    let auth_value = auth_header.to_str().map_err(|_| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Invalid Authorization header encoding",
        )
    })?;

    auth_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Authorization header must use Bearer scheme",
        )
    })
}

/// Length-independent comparison so response timing does not leak a prefix.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            tracing::warn!(path = %parts.uri.path(), "Admin route called without ADMIN_TOKEN configured");
            return Ok(AdminAuth);
        };

        let token = extract_bearer_token(parts)?;
        if tokens_match(token.trim(), expected) {
            Ok(AdminAuth)
        } else {
            Err(ApiError::auth_error(
                "AUTH_INVALID_TOKEN",
                "Invalid admin token",
            ))
        }
    }
}
