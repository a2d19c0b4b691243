//! Registration handler
//!
//! Handles POST /add: stores metadata under a digest the client computed.

use axum::{extract::State, Json};
use imprint_core::RecordMetadata;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::parse_digest;

/// Registration body: the digest plus metadata fields at the top level.
///
/// Metadata may also be nested under `metadata`. Any other fields are kept
/// verbatim on the record.
///
/// OpenAPI schema only; the handler reads the raw JSON object.
#[derive(Debug, ToSchema)]
#[schema(example = json!({
    "digest": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
    "perceptualFingerprint": "f0f0f0f0f0f0f0f0",
    "ownerAssetId": "0x7a3c9e1f",
    "title": "Sunset over the bay",
    "licensingInfo": {"derivativesAllowed": true, "revenueShare": 10, "mintingFee": 0.5}
}))]
#[schema(rename_all = "camelCase")]
pub struct AddRequest {
    pub digest: String,
    pub perceptual_fingerprint: Option<String>,
    pub owner_asset_id: Option<String>,
    pub title: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub licensing_info: Option<Value>,
}

/// Registration result
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddResponse {
    /// False when the digest was already registered (first write wins)
    pub inserted: bool,
    pub digest: String,
    /// The metadata now stored under the digest
    #[schema(value_type = Object)]
    pub metadata: RecordMetadata,
}

/// Split a registration body into its digest and metadata fields.
fn split_body(mut body: Map<String, Value>) -> Result<(String, Map<String, Value>), ApiError> {
    let digest = match (body.remove("digest"), body.remove("hash")) {
        (Some(Value::String(d)), _) | (None, Some(Value::String(d))) => d,
        (None, None) => return Err(ApiError::bad_request("Missing 'digest' field")),
        _ => return Err(ApiError::bad_request("'digest' must be a hex string")),
    };

    match body.remove("metadata") {
        Some(Value::Object(nested)) => {
            for (key, value) in nested {
                body.entry(key).or_insert(value);
            }
        }
        Some(other) => {
            body.insert("metadata".to_string(), other);
        }
        None => {}
    }

    Ok((digest, body))
}

/// Register an asset
///
/// Idempotent: re-adding a digest leaves the stored record untouched and
/// returns it with `inserted: false`. `createdAt` is filled in when absent.
#[utoipa::path(
    post,
    path = "/add",
    tag = "Registry",
    request_body = AddRequest,
    responses(
        (status = 200, description = "Registered, or already present", body = AddResponse),
        (status = 400, description = "Missing or malformed digest or metadata"),
        (status = 503, description = "Registry unavailable")
    )
)]
pub async fn add_handler(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<AddResponse>, ApiError> {
    let (digest, fields) = split_body(body)?;
    let digest = parse_digest(&digest)?;

    let mut metadata = RecordMetadata::default().merged_with(&fields)?;
    metadata
        .created_at
        .get_or_insert_with(|| chrono::Utc::now().timestamp_millis());

    let registry = state.registry();
    let inserted = registry.add(&digest, metadata.clone()).await?;

    let metadata = if inserted {
        metadata
    } else {
        tracing::info!(digest = %digest.short(), "Digest already registered");
        registry
            .check_by_digest(&digest)
            .await?
            .unwrap_or(metadata)
    };

    Ok(Json(AddResponse {
        inserted,
        digest: digest.to_string(),
        metadata,
    }))
}
