//! Watermark handlers
//!
//! Handles POST /watermark/embed and POST /watermark/extract.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use imprint_core::{digest, WatermarkPayload, WatermarkVerdict};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Response header carrying the digest of the watermarked PNG.
pub const DIGEST_HEADER: &str = "x-imprint-digest";

/// Watermarked image returned as JSON when `format=base64`
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmbedResponse {
    /// Base64-encoded PNG
    pub image: String,
    /// Digest of the PNG bytes, the value to register
    pub digest: String,
    #[schema(example = "image/png")]
    pub content_type: &'static str,
}

/// Watermark verdict
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    /// Whether a valid watermark frame was decoded
    pub found: bool,
    /// Embedded payload when found
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub payload: Option<WatermarkPayload>,
    /// Mean fraction of samples agreeing with each decoded bit (0 when not found)
    #[schema(example = 0.97)]
    pub confidence: f64,
    /// True when the image carries another owner's watermark
    pub block_registration: bool,
}

impl From<WatermarkVerdict> for ExtractResponse {
    fn from(verdict: WatermarkVerdict) -> Self {
        Self {
            found: verdict.found,
            payload: verdict.payload,
            confidence: verdict.confidence,
            block_registration: verdict.block_registration,
        }
    }
}

/// Parse the `payload` field, stamping `createdAt` when the client left it out.
/// Insert `names[0]` when none of its accepted spellings is present.
fn fill_default(raw: &mut Map<String, Value>, names: &[&str], value: impl FnOnce() -> Value) {
    if !names.iter().any(|name| raw.contains_key(*name)) {
        raw.insert(names[0].to_string(), value());
    }
}

fn payload_from_fields(fields: &MultipartFields) -> Result<WatermarkPayload, ApiError> {
    let mut raw: Map<String, Value> = fields
        .get_json("payload")?
        .ok_or_else(|| ApiError::bad_request("No payload provided. Use 'payload' JSON field."))?;

    fill_default(&mut raw, &["createdAt", "timestamp"], || {
        Value::from(chrono::Utc::now().timestamp_millis())
    });
    fill_default(&mut raw, &["licenseTerms"], || Value::from(""));
    fill_default(
        &mut raw,
        &["attributionText", "attribution", "copyrightInfo"],
        || Value::from(""),
    );
    fill_default(&mut raw, &["extraMetadata", "metadata"], || {
        Value::Object(Map::new())
    });

    let payload: WatermarkPayload = serde_json::from_value(Value::Object(raw))
        .map_err(|e| ApiError::bad_request(format!("Invalid payload: {e}")))?;

    if payload.owner_asset_id.trim().is_empty() {
        return Err(ApiError::bad_request("payload.ownerAssetId must not be empty"));
    }
    Ok(payload)
}

/// Embed a watermark
///
/// Accepts multipart/form-data with:
/// - **file** (required): the source image
/// - **payload** (required): JSON `{ownerAssetId, licenseTerms?, attributionText?, extraMetadata?, createdAt?}`
/// - **format** (optional): `base64` for a JSON response instead of raw PNG
///
/// The output is always PNG; lossy re-encoding would destroy the mark.
#[utoipa::path(
    post,
    path = "/watermark/embed",
    tag = "Watermark",
    request_body(content_type = "multipart/form-data", description = "Image in 'file', JSON in 'payload'"),
    responses(
        (status = 200, description = "Watermarked PNG; an EmbedResponse JSON body when format=base64", content_type = "image/png"),
        (status = 400, description = "Missing file/payload or undecodable image"),
        (status = 413, description = "Payload frame too large"),
        (status = 422, description = "Image too small for the payload")
    )
)]
pub async fn embed_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let payload = payload_from_fields(&fields)?;
    let as_base64 = fields
        .get_text("format")
        .is_some_and(|f| f.eq_ignore_ascii_case("base64"));
    let file = fields.take_file()?;

    let png = state.matcher.embed_watermark(file.data, &payload).await?;
    let png_digest = digest(&png);

    tracing::info!(
        owner = %payload.owner_asset_id,
        digest = %png_digest.short(),
        size = png.len(),
        "Watermark embedded"
    );

    if as_base64 {
        return Ok(Json(EmbedResponse {
            image: BASE64.encode(&png),
            digest: png_digest.to_string(),
            content_type: "image/png",
        })
        .into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::HeaderName::from_static(DIGEST_HEADER), png_digest.to_string()),
        ],
        png,
    )
        .into_response())
}

/// Extract a watermark
///
/// Accepts multipart/form-data with:
/// - **file** (required): the image to inspect
/// - **claimant** (optional): owner id of the party trying to register the image
///
/// An image without a readable mark is a normal negative (`found: false`).
#[utoipa::path(
    post,
    path = "/watermark/extract",
    tag = "Watermark",
    request_body(content_type = "multipart/form-data", description = "Image in 'file', optional 'claimant'"),
    responses(
        (status = 200, description = "Extraction completed", body = ExtractResponse),
        (status = 400, description = "Missing file or undecodable image")
    )
)]
pub async fn extract_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let claimant = fields.get_text("claimant").map(str::to_string);
    let file = fields.take_file()?;

    let verdict = state
        .matcher
        .inspect_watermark(file.data, claimant.as_deref())
        .await?;

    Ok(Json(verdict.into()))
}
