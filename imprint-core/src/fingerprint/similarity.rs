//! Similarity scoring between perceptual fingerprints.

use super::perceptual::{PerceptualFingerprint, FINGERPRINT_BITS};

/// Largest possible distance between two 64-bit fingerprints.
pub const MAX_DISTANCE: u32 = FINGERPRINT_BITS;

/// Similarity required for an identical-looking image.
pub const EXACT_THRESHOLD: f64 = 100.0;

/// Default similarity at or above which two images are near-duplicates.
///
/// 75% corresponds to a Hamming distance of at most 16 bits.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 75.0;

/// Hamming distance between two hex-rendered fingerprints.
///
/// Corresponding nibbles are XORed and their set bits summed. Inputs of
/// different length, or containing non-hex (including non-ASCII) characters, are treated as
/// maximally distant. The result never exceeds [`MAX_DISTANCE`].
pub fn hamming_distance(a: &str, b: &str) -> u32 {
    if !a.is_ascii() || !b.is_ascii() || a.len() != b.len() {
        return MAX_DISTANCE;
    }

    let mut distance = 0u32;
    for (x, y) in a.chars().zip(b.chars()) {
        match (x.to_digit(16), y.to_digit(16)) {
            (Some(x), Some(y)) => distance += (x ^ y).count_ones(),
            _ => return MAX_DISTANCE,
        }
    }

    distance.min(MAX_DISTANCE)
}

/// Hamming distance between two parsed fingerprints.
pub fn fingerprint_distance(a: &PerceptualFingerprint, b: &PerceptualFingerprint) -> u32 {
    a.distance(b)
}

/// Similarity percentage for a distance, rounded to one decimal place.
///
/// 0 bits apart is 100.0, 64 bits apart is 0.0. Larger distances clamp to 0.0.
pub fn similarity_percent(distance: u32) -> f64 {
    let d = distance.min(MAX_DISTANCE);
    let raw = f64::from(MAX_DISTANCE - d) / f64::from(MAX_DISTANCE) * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Whether a distance is similar enough to meet `threshold` percent.
pub fn is_match(distance: u32, threshold: f64) -> bool {
    similarity_percent(distance) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_reflexive() {
        assert_eq!(hamming_distance("f0f0f0f0f0f0f0f0", "f0f0f0f0f0f0f0f0"), 0);
    }

    #[test]
    fn test_hamming_symmetric() {
        let a = "0123456789abcdef";
        let b = "fedcba9876543210";
        assert_eq!(hamming_distance(a, b), hamming_distance(b, a));
    }

    #[test]
    fn test_hamming_opposites() {
        assert_eq!(hamming_distance("0000000000000000", "ffffffffffffffff"), 64);
        assert_eq!(hamming_distance("0000000000000000", "0000000000000003"), 2);
    }

    #[test]
    fn test_hamming_rejects_non_ascii() {
        // Same byte length, different character count
        assert_eq!(hamming_distance("\u{e9}0", "000"), MAX_DISTANCE);
        assert_eq!(hamming_distance("000", "\u{e9}0"), MAX_DISTANCE);
        assert_eq!(hamming_distance("\u{e9}", "\u{e9}"), MAX_DISTANCE);
    }

    #[test]
    fn test_hamming_is_case_insensitive() {
        assert_eq!(hamming_distance("ABCDEF0000000000", "abcdef0000000000"), 0);
    }

    #[test]
    fn test_hamming_unequal_length_is_max() {
        assert_eq!(hamming_distance("abc", "abcd"), MAX_DISTANCE);
        assert_eq!(hamming_distance("", "0000000000000000"), MAX_DISTANCE);
    }

    #[test]
    fn test_hamming_non_hex_is_max() {
        assert_eq!(hamming_distance("000000000000000z", "0000000000000000"), MAX_DISTANCE);
    }

    #[test]
    fn test_hamming_longer_inputs_are_capped() {
        let a = "0".repeat(32);
        let b = "f".repeat(32);
        assert_eq!(hamming_distance(&a, &b), MAX_DISTANCE);
    }

    #[test]
    fn test_similarity_endpoints() {
        assert_eq!(similarity_percent(0), 100.0);
        assert_eq!(similarity_percent(64), 0.0);
        assert_eq!(similarity_percent(200), 0.0);
    }

    #[test]
    fn test_similarity_rounds_to_one_decimal() {
        // 63/64 = 98.4375
        assert_eq!(similarity_percent(1), 98.4);
        // 59/64 = 92.1875
        assert_eq!(similarity_percent(5), 92.2);
    }

    #[test]
    fn test_similarity_is_monotonic() {
        let scores: Vec<f64> = (0..=64).map(similarity_percent).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_near_duplicate_boundary() {
        assert_eq!(similarity_percent(16), 75.0);
        assert!(is_match(16, NEAR_DUPLICATE_THRESHOLD));
        assert_eq!(similarity_percent(17), 73.4);
        assert!(!is_match(17, NEAR_DUPLICATE_THRESHOLD));
    }

    #[test]
    fn test_exact_threshold() {
        assert!(is_match(0, EXACT_THRESHOLD));
        assert!(!is_match(1, EXACT_THRESHOLD));
    }

    #[test]
    fn test_fingerprint_distance_matches_hex() {
        let a = PerceptualFingerprint::new(0x0123_4567_89AB_CDEF);
        let b = PerceptualFingerprint::new(0xFEDC_BA98_7654_3210);
        assert_eq!(
            fingerprint_distance(&a, &b),
            hamming_distance(&a.to_hex(), &b.to_hex())
        );
    }
}
