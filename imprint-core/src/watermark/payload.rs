//! Watermark payloads and their framed bit representation.
//!
//! A frame is a 16-bit big-endian length followed by the JSON payload and a
//! one-byte XOR checksum of the payload bytes. The length counts the payload
//! plus the checksum byte.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ImprintError, Result};

/// Number of bits in the frame length header.
pub const LENGTH_HEADER_BITS: usize = 16;

/// Largest value the length header can carry.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Smallest valid frame body: at least one payload byte plus the checksum.
pub const MIN_FRAME_LEN: usize = 2;

/// Ownership and licensing data carried inside an image.
///
/// Every field is mandatory when reading a frame back; a frame missing any of
/// them is not a watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkPayload {
    #[serde(alias = "ipId")]
    pub owner_asset_id: String,
    pub license_terms: String,
    #[serde(alias = "attribution", alias = "copyrightInfo")]
    pub attribution_text: String,
    #[serde(alias = "metadata")]
    pub extra_metadata: Map<String, Value>,
    /// Epoch milliseconds.
    #[serde(alias = "timestamp")]
    pub created_at: i64,
}

impl WatermarkPayload {
    /// Payload stamped with the current time and empty optional fields.
    pub fn new(owner_asset_id: impl Into<String>) -> Self {
        Self {
            owner_asset_id: owner_asset_id.into(),
            license_terms: String::new(),
            attribution_text: String::new(),
            extra_metadata: Map::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_license_terms(mut self, terms: impl Into<String>) -> Self {
        self.license_terms = terms.into();
        self
    }

    pub fn with_attribution(mut self, text: impl Into<String>) -> Self {
        self.attribution_text = text.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_metadata.insert(key.into(), value);
        self
    }
}

/// XOR of every byte.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Serialize a payload into a length-prefixed, checksummed frame.
pub fn encode_frame(payload: &WatermarkPayload) -> Result<Vec<u8>> {
    let json =
        serde_json::to_vec(payload).map_err(|e| ImprintError::SerializationError(e.to_string()))?;

    let body_len = json.len() + 1;
    if body_len > MAX_FRAME_LEN {
        return Err(ImprintError::PayloadTooLarge {
            size: body_len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(2 + body_len);
    frame.extend_from_slice(&(body_len as u16).to_be_bytes());
    frame.extend_from_slice(&json);
    frame.push(checksum(&json));
    Ok(frame)
}

/// Parse a frame body (payload bytes followed by the checksum byte).
///
/// Returns `None` on checksum mismatch, invalid UTF-8 or JSON, or missing
/// mandatory fields. These are ordinary negative results.
pub fn decode_frame_body(body: &[u8]) -> Option<WatermarkPayload> {
    let (&expected, json) = body.split_last()?;
    if json.is_empty() || checksum(json) != expected {
        return None;
    }
    let text = std::str::from_utf8(json).ok()?;
    serde_json::from_str(text).ok()
}

/// Expand bytes into bits, most significant bit first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
        .collect()
}

/// Pack bits (most significant first) into bytes. Trailing bits that do not
/// fill a whole byte are dropped.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> WatermarkPayload {
        WatermarkPayload {
            owner_asset_id: "0xA11CE".into(),
            license_terms: "remix-with-attribution".into(),
            attribution_text: "Photo by Alice".into(),
            extra_metadata: Map::new(),
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_frame_layout() {
        let payload = sample_payload();
        let json = serde_json::to_vec(&payload).unwrap();
        let frame = encode_frame(&payload).unwrap();

        let declared = u16::from_be_bytes([frame[0], frame[1]]) as usize;
        assert_eq!(declared, json.len() + 1);
        assert_eq!(frame.len(), 2 + declared);
        assert_eq!(&frame[2..frame.len() - 1], json.as_slice());
        assert_eq!(frame[frame.len() - 1], checksum(&json));
    }

    #[test]
    fn test_payload_uses_camel_case() {
        let json = serde_json::to_value(sample_payload()).unwrap();
        assert_eq!(json["ownerAssetId"], "0xA11CE");
        assert_eq!(json["attributionText"], "Photo by Alice");
        assert_eq!(json["createdAt"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_decode_frame_body() {
        let frame = encode_frame(&sample_payload()).unwrap();
        let decoded = decode_frame_body(&frame[2..]).unwrap();
        assert_eq!(decoded, sample_payload());
    }

    #[test]
    fn test_checksum_mismatch_is_rejected() {
        let frame = encode_frame(&sample_payload()).unwrap();
        let mut body = frame[2..].to_vec();
        let last = body.len() - 1;
        body[last] ^= 0xFF;
        assert!(decode_frame_body(&body).is_none());
    }

    fn body_of(value: &Value) -> Vec<u8> {
        let mut body = serde_json::to_vec(value).unwrap();
        body.push(checksum(&body));
        body
    }

    #[test]
    fn test_every_field_is_mandatory() {
        let full = serde_json::to_value(sample_payload()).unwrap();
        assert!(decode_frame_body(&body_of(&full)).is_some());

        for field in [
            "ownerAssetId",
            "licenseTerms",
            "attributionText",
            "extraMetadata",
            "createdAt",
        ] {
            let mut partial = full.clone();
            partial.as_object_mut().unwrap().remove(field);
            assert!(
                decode_frame_body(&body_of(&partial)).is_none(),
                "frame without {field} decoded"
            );
        }
    }

    #[test]
    fn test_owner_and_timestamp_alone_are_rejected() {
        let body = body_of(&serde_json::json!({"ownerAssetId": "0xA", "createdAt": 1}));
        assert!(decode_frame_body(&body).is_none());
    }

    #[test]
    fn test_legacy_field_names() {
        let body = body_of(&serde_json::json!({
            "ipId": "0xB0B",
            "licenseTerms": "commercial",
            "copyrightInfo": "Bob",
            "metadata": {"series": "dawn"},
            "timestamp": 42
        }));
        let payload = decode_frame_body(&body).unwrap();
        assert_eq!(payload.owner_asset_id, "0xB0B");
        assert_eq!(payload.license_terms, "commercial");
        assert_eq!(payload.attribution_text, "Bob");
        assert_eq!(payload.extra_metadata["series"], "dawn");
        assert_eq!(payload.created_at, 42);
    }

    #[test]
    fn test_oversized_payload() {
        let payload = sample_payload().with_extra("blob", Value::String("x".repeat(70_000)));
        let err = encode_frame(&payload).unwrap_err();
        assert!(matches!(err, ImprintError::PayloadTooLarge { max, .. } if max == MAX_FRAME_LEN));
    }

    #[test]
    fn test_bits_are_msb_first() {
        assert_eq!(
            bytes_to_bits(&[0b1000_0001]),
            vec![true, false, false, false, false, false, false, true]
        );
        assert_eq!(bits_to_bytes(&bytes_to_bits(&[0xA5, 0x3C])), vec![0xA5, 0x3C]);
        assert!(bits_to_bytes(&[true, false, true]).is_empty());
    }
}
