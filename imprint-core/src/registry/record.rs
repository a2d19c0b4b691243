//! Registry records and the persisted snapshot document.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ImprintError, Result};
use crate::fingerprint::{ContentDigest, PerceptualFingerprint};

/// Current snapshot document version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Metadata keys written by older clients and their current names.
pub const LEGACY_ALIASES: [(&str, &str); 4] = [
    ("pHash", "perceptualFingerprint"),
    ("ipId", "ownerAssetId"),
    ("timestamp", "createdAt"),
    ("visionDescription", "visionSummary"),
];

/// How a candidate matched a registered asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Perceptual,
    None,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Perceptual => write!(f, "perceptual"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Licensing terms attached to a registered asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivatives_allowed: Option<bool>,
    /// Percentage of derivative revenue owed to the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_share: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minting_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Match bookkeeping for a registered asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    #[serde(default)]
    pub match_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_matched_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_match_type: Option<MatchType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_similarity: Option<f64>,
}

/// Ownership and licensing metadata stored against a digest.
///
/// Fields this type does not know about are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(default, alias = "pHash", skip_serializing_if = "Option::is_none")]
    pub perceptual_fingerprint: Option<PerceptualFingerprint>,
    #[serde(default, alias = "ipId", skip_serializing_if = "Option::is_none")]
    pub owner_asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Epoch milliseconds.
    #[serde(default, alias = "timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licensing_info: Option<LicensingInfo>,
    #[serde(default, alias = "visionDescription", skip_serializing_if = "Option::is_none")]
    pub vision_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_stats: Option<MatchStats>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecordMetadata {
    pub fn with_owner(owner_asset_id: impl Into<String>) -> Self {
        Self {
            owner_asset_id: Some(owner_asset_id.into()),
            ..Default::default()
        }
    }

    /// Recorded `derivativesAllowed`, if any.
    pub fn derivatives_allowed(&self) -> Option<bool> {
        self.licensing_info
            .as_ref()
            .and_then(|l| l.derivatives_allowed)
    }

    /// Shallow merge-patch of top-level keys.
    ///
    /// Keys in `patch` replace existing keys wholesale; a `null` value removes
    /// the key. Legacy key names are accepted. The merged result must still be
    /// valid metadata.
    pub fn merged_with(&self, patch: &Map<String, Value>) -> Result<Self> {
        let mut current = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(ImprintError::SerializationError(e.to_string())),
        };

        for (key, value) in normalize_keys(patch.clone()) {
            if value.is_null() {
                current.remove(&key);
            } else {
                current.insert(key, value);
            }
        }

        serde_json::from_value(Value::Object(current))
            .map_err(|e| ImprintError::InvalidMetadata(e.to_string()))
    }
}

/// Rename legacy metadata keys to their current names.
///
/// A legacy key never overrides a current key present in the same map.
pub fn normalize_keys(mut fields: Map<String, Value>) -> Map<String, Value> {
    for (legacy, current) in LEGACY_ALIASES {
        if let Some(value) = fields.remove(legacy) {
            if !fields.contains_key(current) {
                fields.insert(current.to_string(), value);
            }
        }
    }
    fields
}

/// A registered asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    #[serde(alias = "hash")]
    pub digest: ContentDigest,
    pub metadata: RecordMetadata,
}

/// The registry's single persisted document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub version: u32,
    /// Ordered by registration.
    pub entries: Vec<FingerprintRecord>,
    /// Epoch milliseconds of the last write.
    pub last_updated: i64,
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl RegistrySnapshot {
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: Vec::new(),
            last_updated: 0,
        }
    }

    pub fn find(&self, digest: &ContentDigest) -> Option<&FingerprintRecord> {
        self.entries.iter().find(|r| &r.digest == digest)
    }

    pub fn find_mut(&mut self, digest: &ContentDigest) -> Option<&mut FingerprintRecord> {
        self.entries.iter_mut().find(|r| &r.digest == digest)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| ImprintError::SerializationError(e.to_string()))
    }

    /// Parse a stored document, migrating legacy entries.
    ///
    /// A document that is not a JSON object is corrupt and is reported as an
    /// error rather than read as an empty registry. Individual entries that
    /// cannot be parsed, and repeated digests, are skipped with a warning.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|e| ImprintError::CorruptSnapshot(e.to_string()))?;
        let Value::Object(mut root) = document else {
            return Err(ImprintError::CorruptSnapshot(
                "document is not a JSON object".into(),
            ));
        };

        let version = root
            .get("version")
            .and_then(Value::as_u64)
            .map_or(SNAPSHOT_VERSION, |v| v as u32);
        let last_updated = root
            .get("lastUpdated")
            .and_then(Value::as_i64)
            .unwrap_or(0);

        let raw_entries = match root.remove("entries") {
            Some(Value::Array(entries)) => entries,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(ImprintError::CorruptSnapshot(
                    "entries is not an array".into(),
                ))
            }
        };

        let mut seen = HashSet::with_capacity(raw_entries.len());
        let mut entries = Vec::with_capacity(raw_entries.len());
        for (index, raw) in raw_entries.into_iter().enumerate() {
            match parse_entry(raw) {
                Ok(record) => {
                    if seen.insert(record.digest.clone()) {
                        entries.push(record);
                    } else {
                        warn!(index, digest = %record.digest.short(), "Skipping duplicate registry entry");
                    }
                }
                Err(reason) => {
                    warn!(index, reason = %reason, "Skipping malformed registry entry");
                }
            }
        }

        Ok(Self {
            version,
            entries,
            last_updated,
        })
    }
}

fn parse_entry(raw: Value) -> std::result::Result<FingerprintRecord, String> {
    let Value::Object(mut fields) = raw else {
        return Err("entry is not an object".into());
    };

    let digest = fields
        .remove("digest")
        .or_else(|| fields.remove("hash"))
        .ok_or("missing digest")?;
    let digest = digest
        .as_str()
        .ok_or("digest is not a string")
        .map_err(String::from)
        .and_then(|s| ContentDigest::parse(s).map_err(|e| e.to_string()))?;

    let metadata = match fields.remove("metadata") {
        Some(Value::Object(nested)) => nested,
        // Legacy layout: metadata fields sit next to the digest.
        None | Some(Value::Null) => fields,
        Some(_) => return Err("metadata is not an object".into()),
    };

    let metadata: RecordMetadata = serde_json::from_value(Value::Object(normalize_keys(metadata)))
        .map_err(|e| e.to_string())?;

    Ok(FingerprintRecord { digest, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::digest;
    use serde_json::json;

    fn hex_digest(seed: &[u8]) -> String {
        digest(seed).to_string()
    }

    #[test]
    fn test_metadata_roundtrip_keeps_unknown_fields() {
        let raw = json!({
            "ownerAssetId": "0xA11CE",
            "title": "Sunset",
            "licensingInfo": {"derivativesAllowed": true, "revenueShare": 10.0, "royaltyPolicy": "lap"},
            "mediaType": "image/png",
            "tags": ["beach", "sky"]
        });
        let metadata: RecordMetadata = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(metadata.owner_asset_id.as_deref(), Some("0xA11CE"));
        assert_eq!(metadata.derivatives_allowed(), Some(true));
        assert_eq!(metadata.extra["mediaType"], "image/png");

        let back = serde_json::to_value(&metadata).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_legacy_metadata_names() {
        let metadata: RecordMetadata = serde_json::from_value(json!({
            "pHash": "f0f0f0f0f0f0f0f0",
            "ipId": "0xB0B",
            "timestamp": 1700000000000i64,
            "visionDescription": "a red bicycle"
        }))
        .unwrap();
        assert_eq!(
            metadata.perceptual_fingerprint,
            Some(PerceptualFingerprint::new(0xF0F0_F0F0_F0F0_F0F0))
        );
        assert_eq!(metadata.owner_asset_id.as_deref(), Some("0xB0B"));
        assert_eq!(metadata.created_at, Some(1_700_000_000_000));
        assert_eq!(metadata.vision_summary.as_deref(), Some("a red bicycle"));
        assert!(metadata.extra.is_empty());
    }

    #[test]
    fn test_merge_patch() {
        let metadata = RecordMetadata {
            title: Some("Old".into()),
            vision_summary: Some("cat".into()),
            ..RecordMetadata::with_owner("0x1")
        };
        let patch = json!({"title": "New", "visionSummary": null, "rating": 5});
        let merged = metadata.merged_with(patch.as_object().unwrap()).unwrap();

        assert_eq!(merged.title.as_deref(), Some("New"));
        assert_eq!(merged.vision_summary, None);
        assert_eq!(merged.owner_asset_id.as_deref(), Some("0x1"));
        assert_eq!(merged.extra["rating"], 5);
    }

    #[test]
    fn test_merge_patch_accepts_legacy_keys() {
        let metadata = RecordMetadata {
            vision_summary: Some("cat".into()),
            ..Default::default()
        };
        let patch = json!({"visionDescription": "dog"});
        let merged = metadata.merged_with(patch.as_object().unwrap()).unwrap();
        assert_eq!(merged.vision_summary.as_deref(), Some("dog"));
    }

    #[test]
    fn test_merge_patch_rejects_invalid_result() {
        let patch = json!({"perceptualFingerprint": "not-hex"});
        let err = RecordMetadata::default()
            .merged_with(patch.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, ImprintError::InvalidMetadata(_)));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = RegistrySnapshot {
            version: SNAPSHOT_VERSION,
            entries: vec![FingerprintRecord {
                digest: digest(b"one"),
                metadata: RecordMetadata::with_owner("0x1"),
            }],
            last_updated: 42,
        };
        let value: Value = serde_json::from_slice(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["lastUpdated"], 42);
        assert_eq!(value["entries"][0]["digest"], hex_digest(b"one"));
        assert_eq!(value["entries"][0]["metadata"]["ownerAssetId"], "0x1");

        let parsed = RegistrySnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_migrates_legacy_document() {
        let legacy = json!({
            "entries": [
                {"hash": hex_digest(b"a"), "ipId": "0xA", "title": "A", "pHash": "00000000000000ff"},
                {"hash": hex_digest(b"b"), "metadata": {"ipId": "0xB"}}
            ],
            "lastUpdated": 1700000000000i64
        });
        let snapshot = RegistrySnapshot::from_json(legacy.to_string().as_bytes()).unwrap();

        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.len(), 2);
        let a = &snapshot.entries[0].metadata;
        assert_eq!(a.owner_asset_id.as_deref(), Some("0xA"));
        assert_eq!(a.title.as_deref(), Some("A"));
        assert_eq!(a.perceptual_fingerprint, Some(PerceptualFingerprint::new(0xFF)));
        assert_eq!(
            snapshot.entries[1].metadata.owner_asset_id.as_deref(),
            Some("0xB")
        );
    }

    #[test]
    fn test_skips_malformed_and_duplicate_entries() {
        let doc = json!({
            "entries": [
                {"digest": hex_digest(b"a"), "metadata": {"title": "first"}},
                {"digest": "nothex", "metadata": {}},
                "just a string",
                {"metadata": {"title": "no digest"}},
                {"digest": hex_digest(b"a"), "metadata": {"title": "second"}},
                {"digest": hex_digest(b"c"), "metadata": {"perceptualFingerprint": 12}}
            ]
        });
        let snapshot = RegistrySnapshot::from_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries[0].metadata.title.as_deref(), Some("first"));
    }

    #[test]
    fn test_corrupt_documents_are_errors() {
        for bad in [&b"[1, 2, 3]"[..], b"{not json", b"\"text\"", b"{\"entries\": 5}"] {
            assert!(matches!(
                RegistrySnapshot::from_json(bad),
                Err(ImprintError::CorruptSnapshot(_))
            ));
        }
    }

    #[test]
    fn test_empty_object_is_empty_registry() {
        let snapshot = RegistrySnapshot::from_json(b"{}").unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_match_type_serialization() {
        assert_eq!(serde_json::to_string(&MatchType::Perceptual).unwrap(), "\"perceptual\"");
        assert_eq!(serde_json::to_string(&MatchType::None).unwrap(), "\"none\"");
    }
}
