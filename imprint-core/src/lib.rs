//! Imprint Core - content fingerprints and invisible watermarks for asset licensing
//!
//! This crate detects exact and near-duplicate images and ties them to
//! ownership and licensing metadata.
//!
//! # Features
//!
//! - Exact content digests (SHA-256 by default, SHA3-256 optional)
//! - 64-bit perceptual fingerprints with Hamming-distance similarity
//! - Invisible watermarks carrying a JSON payload, decoded by majority vote
//! - A digest-keyed registry over pluggable snapshot stores (`registry` feature)
//! - An HTTP snapshot store (`network` feature)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use imprint_core::{Matcher, MatcherConfig, RecordMetadata, Registry};
//!
//! # async fn example() -> imprint_core::Result<()> {
//! let registry = Arc::new(Registry::in_memory());
//! let matcher = Matcher::new(registry, MatcherConfig::default())?;
//!
//! let image = std::fs::read("photo.png")?;
//! matcher.register(image.clone(), RecordMetadata::with_owner("0xA11CE"), None).await?;
//!
//! let check = matcher.check_candidate(image).await?;
//! assert!(check.found);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fingerprint;
pub mod watermark;

#[cfg(feature = "registry")]
pub mod matcher;
#[cfg(feature = "registry")]
pub mod registry;

// Re-export main types for convenience
pub use error::{ImprintError, Result};
pub use fingerprint::{
    compute_fingerprint, digest, digest_with, hamming_distance, is_match, similarity_percent,
    ContentDigest, DigestAlgorithm, PerceptualFingerprint, PerceptualHasher, EXACT_THRESHOLD,
    NEAR_DUPLICATE_THRESHOLD,
};
pub use watermark::{
    embed_watermark, extract_watermark, WatermarkCodec, WatermarkConfig, WatermarkExtraction,
    WatermarkPayload, WatermarkVerdict,
};

#[cfg(feature = "registry")]
pub use matcher::{CandidateCheck, Matcher, MatcherConfig, Registration};
#[cfg(feature = "registry")]
pub use registry::{
    FileSnapshotStore, FingerprintRecord, LicensingInfo, MatchType, MemorySnapshotStore,
    RecordMetadata, Registry, RegistrySnapshot, SimilarityMatch, SnapshotStore,
};

#[cfg(feature = "network")]
pub use registry::HttpSnapshotStore;
