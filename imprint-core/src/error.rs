use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImprintError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Invalid content digest: {0}")]
    InvalidDigest(String),

    #[error("Invalid perceptual fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Watermark frame too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Image too small for watermark: needs {needed} bits, capacity is {capacity} bits")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Corrupt registry snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Background task failed: {0}")]
    TaskError(String),

    #[cfg(feature = "network")]
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl ImprintError {
    /// Whether this error means the outcome of a check could not be determined.
    ///
    /// Infrastructure failures must never be read as "no match": a caller
    /// gating registrations has to reject or retry the request instead.
    pub fn is_undetermined(&self) -> bool {
        match self {
            Self::Io(_)
            | Self::StorageError(_)
            | Self::CorruptSnapshot(_)
            | Self::TaskError(_) => true,
            #[cfg(feature = "network")]
            Self::HttpError(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImprintError>;
