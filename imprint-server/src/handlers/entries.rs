//! Metadata update handler
//!
//! Handles PATCH /entries/{digest}, used by the upload flow to attach a
//! vision summary or licensing terms after registration.

use axum::{
    extract::{Path, State},
    Json,
};
use imprint_core::RecordMetadata;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::parse_digest;

/// Merge-patch body. Top-level keys replace stored keys; `null` removes one.
///
/// OpenAPI schema only; the handler reads the raw JSON object.
#[derive(Debug, ToSchema)]
#[schema(example = json!({
    "visionSummary": "A sailboat at sunset, warm palette",
    "licensingInfo": {"derivativesAllowed": false}
}))]
#[schema(rename_all = "camelCase")]
pub struct MetadataPatch {
    pub vision_summary: Option<String>,
    pub title: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub licensing_info: Option<Value>,
}

/// Updated entry
#[derive(Debug, Serialize, ToSchema)]
pub struct EntryResponse {
    pub digest: String,
    #[schema(value_type = Object)]
    pub metadata: RecordMetadata,
}

/// Patch an entry's metadata
#[utoipa::path(
    patch,
    path = "/entries/{digest}",
    tag = "Registry",
    params(("digest" = String, Path, description = "Content digest (64 hex chars)")),
    request_body = MetadataPatch,
    responses(
        (status = 200, description = "Metadata updated", body = EntryResponse),
        (status = 400, description = "Malformed digest, or patch yields invalid metadata"),
        (status = 404, description = "Digest not registered"),
        (status = 503, description = "Registry unavailable")
    )
)]
pub async fn update_entry_handler(
    State(state): State<AppState>,
    Path(digest): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> Result<Json<EntryResponse>, ApiError> {
    let digest = parse_digest(&digest)?;
    let registry = state.registry();

    if !registry.update_metadata(&digest, &patch).await? {
        return Err(ApiError::not_found(format!("No entry for digest {digest}")));
    }

    let metadata = registry
        .check_by_digest(&digest)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No entry for digest {digest}")))?;

    Ok(Json(EntryResponse {
        digest: digest.to_string(),
        metadata,
    }))
}
