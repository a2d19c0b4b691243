//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use imprint_core::{
    FileSnapshotStore, HttpSnapshotStore, Matcher, MatcherConfig, Registry, SnapshotStore,
};
use tracing::debug;

use crate::exit_codes::CliError;
use crate::RegistryArgs;

/// Open the registry described by `--registry` / `--registry-url`.
pub fn open_registry(args: &RegistryArgs) -> Result<Arc<Registry>> {
    let store: Arc<dyn SnapshotStore> = match &args.url {
        Some(url) => {
            debug!(%url, "Using HTTP registry");
            Arc::new(HttpSnapshotStore::new(url.as_str()).context("Invalid registry URL")?)
        }
        None => {
            debug!(path = %args.path.display(), "Using file registry");
            Arc::new(FileSnapshotStore::new(&args.path))
        }
    };
    Ok(Arc::new(Registry::new(store)))
}

/// Build a matcher over the configured registry.
pub fn build_matcher(args: &RegistryArgs, config: MatcherConfig) -> Result<Matcher> {
    let registry = open_registry(args)?;
    Matcher::new(registry, config).context("Invalid matcher configuration")
}

/// Read a whole input file, reporting a missing file as an input error.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read file");
    Ok(bytes)
}

/// Write an output file, reporting failures as output errors.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|source| CliError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

/// Default path for a watermarked copy: `photo.jpg` becomes `photo.imprint.png`.
pub fn default_output_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    image.with_file_name(format!("{stem}.imprint.png"))
}

/// Format a Unix timestamp (milliseconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{}ms", timestamp_ms),
    }
}
