//! WebAssembly bindings for Imprint fingerprints and watermarks.
//!
//! Browsers can compute the same digests and fingerprints the server stores,
//! and embed or read watermarks, without uploading the image.

use imprint_core::{
    digest, extract_watermark, hamming_distance as hex_distance, is_match, PerceptualHasher,
    WatermarkCodec, WatermarkConfig, WatermarkExtraction, WatermarkPayload, WatermarkVerdict,
};
use serde::Serialize;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Fingerprints of one image.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFingerprints {
    /// SHA-256 of the exact bytes (hex encoded)
    pub digest: String,
    /// 64-bit perceptual fingerprint (hex encoded), absent if undecodable
    pub perceptual_fingerprint: Option<String>,
    pub error: Option<String>,
}

/// Exact SHA-256 digest of `bytes` as lowercase hex.
#[wasm_bindgen]
pub fn digest_hex(bytes: &[u8]) -> String {
    digest(bytes).to_string()
}

/// Perceptual fingerprint of an image as 16 hex characters, or `undefined`
/// when the bytes are not a decodable image.
#[wasm_bindgen]
pub fn fingerprint_hex(image_bytes: &[u8]) -> Option<String> {
    imprint_core::compute_fingerprint(image_bytes).map(|fp| fp.to_hex())
}

/// Digest and perceptual fingerprint of an image.
///
/// # Returns
/// A JSON string; `perceptualFingerprint` is null with an `error` when the
/// bytes are not a decodable image.
#[wasm_bindgen]
pub fn fingerprint_image(image_bytes: &[u8]) -> String {
    let (perceptual_fingerprint, error) = match PerceptualHasher::new().hash_bytes(image_bytes) {
        Ok(fp) => (Some(fp.to_hex()), None),
        Err(e) => (None, Some(e.to_string())),
    };

    to_json(&ImageFingerprints {
        digest: digest_hex(image_bytes),
        perceptual_fingerprint,
        error,
    })
}

/// Hamming distance between two hex fingerprints (64 if malformed).
#[wasm_bindgen]
pub fn hamming_distance(a: &str, b: &str) -> u32 {
    hex_distance(a, b)
}

/// Similarity percentage for a distance, rounded to one decimal.
#[wasm_bindgen]
pub fn similarity_percent(distance: u32) -> f64 {
    imprint_core::similarity_percent(distance)
}

/// Whether two hex fingerprints are at least `threshold` percent similar.
#[wasm_bindgen]
pub fn is_near_duplicate(a: &str, b: &str, threshold: f64) -> bool {
    is_match(hex_distance(a, b), threshold)
}

/// Embed a watermark and return PNG bytes.
///
/// # Arguments
/// * `image_bytes` - JPEG, PNG, GIF or WebP image
/// * `owner_asset_id` - Owner written into the watermark
/// * `license_terms` - Optional license text
/// * `extra_json` - Optional JSON object of extra metadata
#[wasm_bindgen]
pub fn embed_watermark_wasm(
    image_bytes: &[u8],
    owner_asset_id: &str,
    license_terms: Option<String>,
    extra_json: Option<String>,
) -> Result<Vec<u8>, JsError> {
    let owner = owner_asset_id.trim();
    if owner.is_empty() {
        return Err(JsError::new("ownerAssetId must not be empty"));
    }

    let mut payload = WatermarkPayload {
        created_at: js_sys::Date::now() as i64,
        ..WatermarkPayload::new(owner)
    };
    if let Some(terms) = license_terms {
        payload = payload.with_license_terms(terms);
    }
    if let Some(raw) = extra_json {
        payload.extra_metadata = parse_object(&raw)?;
    }

    let codec = WatermarkCodec::new(WatermarkConfig::default())?;
    Ok(codec.embed(image_bytes, &payload)?)
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, JsError> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(JsError::new("extra metadata must be a JSON object")),
        Err(e) => Err(JsError::new(&format!("Invalid extra metadata: {e}"))),
    }
}

/// Read a watermark and decide whether `claimant` may register the image.
///
/// # Returns
/// A JSON string with `found`, `payload`, `confidence` and
/// `blockRegistration`, plus `error` if the image could not be decoded.
#[wasm_bindgen]
pub fn extract_watermark_wasm(image_bytes: &[u8], claimant: Option<String>) -> String {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ExtractResult {
        #[serde(flatten)]
        verdict: WatermarkVerdict,
        error: Option<String>,
    }

    let (extraction, error) = match extract_watermark(image_bytes) {
        Ok(extraction) => (extraction, None),
        Err(e) => (WatermarkExtraction::not_found(), Some(e.to_string())),
    };

    to_json(&ExtractResult {
        verdict: WatermarkVerdict::from_extraction(extraction, claimant.as_deref()),
        error,
    })
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| format!(r#"{{"error":"Serialization error: {}"}}"#, e))
}

/// Get the library version.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_matches_core() {
        assert_eq!(
            digest_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_of_undecodable_bytes() {
        let json: Value = serde_json::from_str(&fingerprint_image(b"not an image")).unwrap();
        assert_eq!(json["digest"].as_str().unwrap().len(), 64);
        assert!(json["perceptualFingerprint"].is_null());
        assert!(json["error"].as_str().unwrap().contains("decode"));
        assert_eq!(fingerprint_hex(b"not an image"), None);
    }

    #[test]
    fn test_distance_helpers() {
        assert_eq!(hamming_distance("ffffffffffffffff", "ffffffffffff0000"), 16);
        assert_eq!(hamming_distance("ff", "ffff"), 64);
        assert_eq!(similarity_percent(16), 75.0);
        assert!(is_near_duplicate("ffffffffffffffff", "ffffffffffff0000", 75.0));
        assert!(!is_near_duplicate("ffffffffffffffff", "ffffffffffff0000", 80.0));
    }

    #[test]
    fn test_extract_from_undecodable_bytes() {
        let json: Value =
            serde_json::from_str(&extract_watermark_wasm(b"junk", Some("0xB0B".into()))).unwrap();
        assert_eq!(json["found"], false);
        assert_eq!(json["blockRegistration"], false);
        assert!(json["error"].is_string());
    }
}
