//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use std::path::PathBuf;

use imprint_core::ImprintError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data error: undecodable image, blocked registration, or a match when one
/// was not allowed. Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Registry backend unavailable or corrupt.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Failures the CLI raises itself, each with a fixed exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Failed to read {}: {source}", path.display())]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Registration blocked: image carries a watermark owned by {owner}")]
    Blocked { owner: String },

    #[error("Match found: {0}")]
    MatchFound(String),
}

impl CliError {
    pub fn code(&self) -> i32 {
        match self {
            Self::Usage(_) => USAGE_ERROR,
            Self::Input { .. } => INPUT_ERROR,
            Self::Output { .. } => IO_ERROR,
            Self::Blocked { .. } | Self::MatchFound(_) => DATA_ERROR,
        }
    }
}

fn imprint_code(err: &ImprintError) -> i32 {
    match err {
        e if e.is_undetermined() && !matches!(e, ImprintError::Io(_)) => UNAVAILABLE,
        ImprintError::Io(_) => IO_ERROR,
        ImprintError::InvalidDigest(_)
        | ImprintError::InvalidFingerprint(_)
        | ImprintError::InvalidConfig(_) => USAGE_ERROR,
        ImprintError::DecodeError(_)
        | ImprintError::InvalidMetadata(_)
        | ImprintError::PayloadTooLarge { .. }
        | ImprintError::CapacityExceeded { .. } => DATA_ERROR,
        _ => GENERAL_ERROR,
    }
}

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    /// Classify by the first typed error found in the chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let code = err
            .chain()
            .find_map(|cause| {
                if let Some(e) = cause.downcast_ref::<CliError>() {
                    Some(e.code())
                } else {
                    cause.downcast_ref::<ImprintError>().map(imprint_code)
                }
            })
            .unwrap_or(GENERAL_ERROR);

        Self {
            code,
            message: Some(format!("{err:#}")),
        }
    }
}
