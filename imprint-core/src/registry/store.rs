//! Backends holding the registry's snapshot document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{ImprintError, Result};

/// Storage for the single registry document.
///
/// Implementations must be thread-safe (`Send + Sync`). A failure to read or
/// write must be reported, never turned into an empty document.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Current document, or `None` if nothing has been written yet.
    async fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the document.
    async fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Human-readable location, for logs and health output.
    fn describe(&self) -> String;
}

/// In-process store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    document: RwLock<Option<Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_document(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            document: RwLock::new(Some(bytes.into())),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.document.read().await.clone())
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        *self.document.write().await = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// JSON file on local disk.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn storage_error(&self, action: &str, err: std::io::Error) -> ImprintError {
        ImprintError::StorageError(format!(
            "Failed to {action} {}: {err}",
            self.path.display()
        ))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Registry file does not exist yet");
                Ok(None)
            }
            Err(e) => Err(self.storage_error("read", e)),
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.storage_error("create directory for", e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes)
            .await
            .map_err(|e| self.storage_error("write", e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.storage_error("replace", e))?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Registry file written");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
