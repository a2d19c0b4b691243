//! Exact digests, perceptual fingerprints and similarity scoring.

pub mod digest;
pub mod perceptual;
pub mod similarity;

pub use digest::{
    digest, digest_file, digest_reader, digest_with, ContentDigest, DigestAlgorithm,
    DIGEST_HEX_LEN,
};
pub use perceptual::{
    compute_fingerprint, PerceptualFingerprint, PerceptualHasher, FINGERPRINT_HEX_LEN,
};
pub use similarity::{
    hamming_distance, is_match, similarity_percent, EXACT_THRESHOLD, MAX_DISTANCE,
    NEAR_DUPLICATE_THRESHOLD,
};
