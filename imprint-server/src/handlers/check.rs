//! Candidate check handlers
//!
//! `POST /check` takes precomputed values (the browser computes the digest
//! through WebCrypto); `POST /check/image` computes them from an upload.

use axum::{
    extract::{Multipart, State},
    Json,
};
use imprint_core::{CandidateCheck, RecordMetadata};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::{parse_digest, parse_fingerprint};

/// Precomputed candidate values
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// SHA-256 of the candidate bytes (64 hex chars)
    #[serde(alias = "hash")]
    #[schema(example = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")]
    pub digest: String,
    /// 64-bit perceptual fingerprint (16 hex chars); exact lookup only when absent
    #[serde(default, alias = "pHash")]
    #[schema(example = "f0f0f0f0f0f0f0f0")]
    pub perceptual_fingerprint: Option<String>,
}

/// Result of a candidate check
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    /// Whether a registered asset matched
    pub found: bool,
    /// `exact`, `perceptual` or `none`
    #[schema(example = "perceptual")]
    pub match_type: String,
    /// Digest of the submitted candidate
    pub candidate_digest: String,
    /// Digest of the matched registry entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Metadata of the matched registry entry
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<RecordMetadata>,
    /// Hamming distance to the matched fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    /// Similarity percentage (one decimal)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 92.2)]
    pub similarity: Option<f64>,
    /// Recorded licensing decision; null means undetermined and needs review
    pub derivatives_allowed: Option<bool>,
}

impl From<CandidateCheck> for CheckResponse {
    fn from(check: CandidateCheck) -> Self {
        Self {
            found: check.found,
            match_type: check.match_type.to_string(),
            candidate_digest: check.candidate_digest.to_string(),
            digest: check.digest.map(|d| d.to_string()),
            metadata: check.metadata,
            distance: check.distance,
            similarity: check.similarity,
            derivatives_allowed: check.derivatives_allowed,
        }
    }
}

/// Check precomputed values
///
/// Exact digest lookup first; on a miss, the closest registered fingerprint at
/// or above the configured similarity threshold.
#[utoipa::path(
    post,
    path = "/check",
    tag = "Matching",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Check completed", body = CheckResponse),
        (status = 400, description = "Malformed digest or fingerprint"),
        (status = 503, description = "Registry unavailable; result undetermined")
    )
)]
pub async fn check_handler(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let digest = parse_digest(&request.digest)?;
    let fingerprint = parse_fingerprint(request.perceptual_fingerprint.as_deref())?;

    let check = state
        .matcher
        .check_fingerprints(&digest, fingerprint.as_ref())
        .await?;

    Ok(Json(check.into()))
}

/// Check an uploaded image
///
/// Accepts multipart/form-data with:
/// - **file** (required): the candidate image
#[utoipa::path(
    post,
    path = "/check/image",
    tag = "Matching",
    request_body(content_type = "multipart/form-data", description = "Candidate image in the 'file' field"),
    responses(
        (status = 200, description = "Check completed", body = CheckResponse),
        (status = 400, description = "Missing file or undecodable image"),
        (status = 503, description = "Registry unavailable; result undetermined")
    )
)]
pub async fn check_image_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CheckResponse>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_file()?;

    tracing::debug!(
        size = file.data.len(),
        file_name = file.file_name.as_deref().unwrap_or("-"),
        "Checking uploaded image"
    );

    let check = state.matcher.check_candidate(file.data).await?;
    Ok(Json(check.into()))
}
