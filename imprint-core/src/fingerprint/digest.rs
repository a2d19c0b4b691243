//! Exact content digests.
//!
//! A digest is computed over the raw, unmodified bytes of an asset. No decoding,
//! resizing or normalization happens here: two files are the same asset only if
//! they are byte-for-byte identical.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

use crate::error::{ImprintError, Result};

/// Digest size in bytes (256 bits).
pub const DIGEST_SIZE: usize = 32;

/// Length of the hex rendering of a digest.
pub const DIGEST_HEX_LEN: usize = DIGEST_SIZE * 2;

const READ_CHUNK: usize = 64 * 1024;

/// Hash function used for content digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestAlgorithm {
    /// SHA-256, matching digests computed in browsers through WebCrypto.
    #[default]
    Sha256,
    /// SHA3-256.
    Sha3_256,
}

impl FromStr for DigestAlgorithm {
    type Err = ImprintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha3" | "sha3-256" | "sha3_256" => Ok(Self::Sha3_256),
            other => Err(ImprintError::InvalidConfig(format!(
                "Unknown digest algorithm: {other}"
            ))),
        }
    }
}

/// A 256-bit content digest rendered as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Parse a hex digest, accepting either case.
    pub fn parse(hex_str: &str) -> Result<Self> {
        let trimmed = hex_str.trim();
        if trimmed.len() != DIGEST_HEX_LEN {
            return Err(ImprintError::InvalidDigest(format!(
                "expected {} hex characters, got {}",
                DIGEST_HEX_LEN,
                trimmed.len()
            )));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ImprintError::InvalidDigest(format!(
                "not a hex string: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Build a digest from raw hash output.
    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(hex::encode(bytes))
    }

    /// The digest as lowercase hex.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines and terminal output.
    pub fn short(&self) -> &str {
        &self.0[..16]
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentDigest {
    type Err = ImprintError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Incremental hasher over either supported algorithm.
enum StreamHasher {
    Sha256(Sha256),
    Sha3(Sha3_256),
}

impl StreamHasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Sha3_256 => Self::Sha3(Sha3_256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha3(h) => h.update(data),
        }
    }

    fn finish(self) -> ContentDigest {
        let mut out = [0u8; DIGEST_SIZE];
        match self {
            Self::Sha256(h) => out.copy_from_slice(&h.finalize()),
            Self::Sha3(h) => out.copy_from_slice(&h.finalize()),
        }
        ContentDigest::from_bytes(out)
    }
}

/// Compute the default (SHA-256) digest of `bytes`.
pub fn digest(bytes: &[u8]) -> ContentDigest {
    digest_with(DigestAlgorithm::default(), bytes)
}

/// Compute the digest of `bytes` with the given algorithm.
pub fn digest_with(algorithm: DigestAlgorithm, bytes: &[u8]) -> ContentDigest {
    let mut hasher = StreamHasher::new(algorithm);
    hasher.update(bytes);
    hasher.finish()
}

/// Stream a reader through the hasher in fixed-size chunks.
///
/// Read errors are returned as-is; nothing is retried.
pub fn digest_reader<R: Read>(algorithm: DigestAlgorithm, mut reader: R) -> Result<ContentDigest> {
    let mut hasher = StreamHasher::new(algorithm);
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finish())
}

/// Digest a file on disk without loading it into memory.
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> Result<ContentDigest> {
    let file = File::open(path)?;
    digest_reader(algorithm, BufReader::new(file))
}
