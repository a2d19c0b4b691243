//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Service name
    #[schema(example = "imprint-server")]
    pub service: &'static str,
    /// Registry snapshot backend
    #[schema(example = "file:data/registry.json")]
    pub registry: String,
}

/// Liveness check
///
/// Returns service status and version without touching the registry.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is running", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "imprint-server",
        registry: state.registry().describe(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service can answer checks
    pub ready: bool,
    /// Number of registered entries when ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    /// Why the service is not ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Readiness check
///
/// Loads the registry snapshot; 503 when the backend is unreachable or the
/// document is corrupt, since every check would be undetermined.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Registry reachable", body = ReadyResponse),
        (status = 503, description = "Registry unavailable", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    match state.registry().load().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                entries: Some(snapshot.len()),
                message: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    entries: None,
                    message: Some(e.to_string()),
                }),
            )
        }
    }
}
