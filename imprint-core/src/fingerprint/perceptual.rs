//! Perceptual fingerprints for images.
//!
//! This module computes a 64-bit fingerprint from the luminance structure of an
//! image so that visually similar images produce fingerprints with a small
//! Hamming distance, even after re-encoding or minor color shifts.
//!
//! # Algorithm
//!
//! 1. Resample the decoded image to a 32x32 grid with a low-pass (triangle) filter.
//! 2. Convert every sample to luminance `Y = 0.299R + 0.587G + 0.114B` (truncated).
//! 3. Split the grid into an 8x8 layout of 4x4 blocks.
//! 4. Bit `i` is set when block `i`'s mean exceeds the global mean.
//!
//! Bit 0 is the most significant bit of the fingerprint. The fingerprint is not
//! designed to survive large rotations or heavy cropping.
//!
//! # Usage
//!
//! ```no_run
//! use imprint_core::fingerprint::PerceptualHasher;
//!
//! let image_data = std::fs::read("image.jpg").unwrap();
//! let hasher = PerceptualHasher::default();
//! let fp1 = hasher.hash_bytes(&image_data).unwrap();
//!
//! let image_data2 = std::fs::read("image2.jpg").unwrap();
//! let fp2 = hasher.hash_bytes(&image_data2).unwrap();
//! let distance = fp1.distance(&fp2);
//! let similar = distance <= 16; // 75% similarity
//! ```

use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ImprintError, Result};

/// Number of bits in a fingerprint.
pub const FINGERPRINT_BITS: u32 = 64;

/// Length of the hex rendering of a fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 16;

/// Side of the luminance grid the image is resampled to.
pub const GRID_SIZE: u32 = 32;

const BLOCK_SIZE: usize = 4;
const BLOCKS_PER_ROW: usize = 8;
const GRID_SAMPLES: usize = (GRID_SIZE * GRID_SIZE) as usize;

/// A 64-bit perceptual fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualFingerprint(u64);

impl PerceptualFingerprint {
    /// Wrap a raw 64-bit fingerprint.
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// The raw bits.
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Render as 16 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse a 16-character hex fingerprint.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let trimmed = hex_str.trim();
        if trimmed.len() != FINGERPRINT_HEX_LEN {
            return Err(ImprintError::InvalidFingerprint(format!(
                "expected {} hex characters, got {}",
                FINGERPRINT_HEX_LEN,
                trimmed.len()
            )));
        }
        u64::from_str_radix(trimmed, 16)
            .map(Self)
            .map_err(|e| ImprintError::InvalidFingerprint(format!("{trimmed}: {e}")))
    }

    /// Number of differing bits between two fingerprints (0..=64).
    pub fn distance(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for PerceptualFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PerceptualFingerprint {
    type Err = ImprintError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for PerceptualFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PerceptualFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Perceptual fingerprint computation.
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    filter: FilterType,
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl PerceptualHasher {
    /// Create a hasher with the default low-pass resampling filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a fingerprint from encoded image bytes (JPEG, PNG, GIF or WebP).
    pub fn hash_bytes(&self, image_data: &[u8]) -> Result<PerceptualFingerprint> {
        let image = image::load_from_memory(image_data)
            .map_err(|e| ImprintError::DecodeError(e.to_string()))?;

        Ok(self.hash_image(&image))
    }

    /// Compute a fingerprint from a decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> PerceptualFingerprint {
        let grid = self.luminance_grid(image);
        fingerprint_from_grid(&grid)
    }

    /// Resample to the 32x32 grid and convert to integer luminance.
    pub fn luminance_grid(&self, image: &DynamicImage) -> Vec<u8> {
        let small = image
            .resize_exact(GRID_SIZE, GRID_SIZE, self.filter)
            .to_rgb8();

        small
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                luminance(r, g, b)
            })
            .collect()
    }
}

/// `0.299R + 0.587G + 0.114B` truncated, in exact integer arithmetic.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000) as u8
}

/// Fold a 32x32 luminance grid (row-major) into a fingerprint.
pub fn fingerprint_from_grid(grid: &[u8]) -> PerceptualFingerprint {
    debug_assert_eq!(grid.len(), GRID_SAMPLES);

    let side = GRID_SIZE as usize;
    let total: u64 = grid.iter().map(|&v| u64::from(v)).sum();

    let mut bits = 0u64;
    for block in 0..(BLOCKS_PER_ROW * BLOCKS_PER_ROW) {
        let top = (block / BLOCKS_PER_ROW) * BLOCK_SIZE;
        let left = (block % BLOCKS_PER_ROW) * BLOCK_SIZE;

        let mut block_sum = 0u64;
        for y in top..top + BLOCK_SIZE {
            let row = &grid[y * side + left..y * side + left + BLOCK_SIZE];
            block_sum += row.iter().map(|&v| u64::from(v)).sum::<u64>();
        }

        // block_sum / 16 > total / 1024, without rounding
        if block_sum * (GRID_SAMPLES / (BLOCK_SIZE * BLOCK_SIZE)) as u64 > total {
            bits |= 1 << (63 - block);
        }
    }

    PerceptualFingerprint(bits)
}

/// Compute a fingerprint for image data using default settings.
///
/// Returns `None` if the data is not a decodable image.
pub fn compute_fingerprint(image_data: &[u8]) -> Option<PerceptualFingerprint> {
    PerceptualHasher::default().hash_bytes(image_data).ok()
}
