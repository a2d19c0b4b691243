//! Registry administration handlers
//!
//! Listing, clearing and deleting entries. Guarded by [`AdminAuth`].

use axum::{
    extract::{Path, State},
    Json,
};
use imprint_core::FingerprintRecord;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::parse_digest;

/// All registered entries, in registration order
#[derive(Debug, Serialize, ToSchema)]
pub struct ListEntriesResponse {
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<FingerprintRecord>,
}

/// Result of clearing the registry
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearResponse {
    /// Number of entries removed
    pub cleared: usize,
}

/// Result of deleting one entry
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub digest: String,
}

/// List all entries
#[utoipa::path(
    get,
    path = "/admin/entries",
    tag = "Admin",
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Registry contents", body = ListEntriesResponse),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 503, description = "Registry unavailable")
    )
)]
pub async fn list_entries_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ListEntriesResponse>, ApiError> {
    let entries = state.registry().list().await?;
    Ok(Json(ListEntriesResponse {
        count: entries.len(),
        entries,
    }))
}

/// Remove every entry
#[utoipa::path(
    delete,
    path = "/admin/entries",
    tag = "Admin",
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Registry cleared", body = ClearResponse),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 503, description = "Registry unavailable")
    )
)]
pub async fn clear_entries_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ApiError> {
    let cleared = state.registry().clear_all().await?;
    tracing::warn!(cleared, "Registry cleared via admin API");
    Ok(Json(ClearResponse { cleared }))
}

/// Delete one entry
#[utoipa::path(
    delete,
    path = "/admin/entries/{digest}",
    tag = "Admin",
    security(("admin_token" = [])),
    params(("digest" = String, Path, description = "Content digest (64 hex chars)")),
    responses(
        (status = 200, description = "Entry deleted", body = DeleteResponse),
        (status = 400, description = "Malformed digest"),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 404, description = "Digest not registered")
    )
)]
pub async fn delete_entry_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let digest = parse_digest(&digest)?;

    if !state.registry().delete_by_digest(&digest).await? {
        return Err(ApiError::not_found(format!("No entry for digest {digest}")));
    }

    Ok(Json(DeleteResponse {
        deleted: true,
        digest: digest.to_string(),
    }))
}
