//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use imprint_core::{
    FileSnapshotStore, HttpSnapshotStore, Matcher, MatcherConfig, MemorySnapshotStore, Registry,
    SnapshotStore,
};

use crate::config::{Config, RegistryBackend};
use crate::validation::DEFAULT_MAX_FILE_SIZE;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Matching orchestrator, owning the registry
    pub matcher: Arc<Matcher>,
    /// Bearer token required by the admin routes (open when `None`)
    pub admin_token: Option<Arc<str>>,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Wrap an existing matcher with default limits and no admin token.
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher: Arc::new(matcher),
            admin_token: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Build the registry, matcher and limits described by `config`.
    pub fn from_config(config: &Config) -> imprint_core::Result<Self> {
        let store: Arc<dyn SnapshotStore> = match &config.registry {
            RegistryBackend::Memory => Arc::new(MemorySnapshotStore::new()),
            RegistryBackend::File(path) => Arc::new(FileSnapshotStore::new(path.clone())),
            RegistryBackend::Http {
                url,
                bearer_token,
                timeout,
            } => {
                let store = HttpSnapshotStore::with_timeout(url.clone(), *timeout)?;
                match bearer_token {
                    Some(token) => Arc::new(store.with_bearer_token(token.clone())),
                    None => Arc::new(store),
                }
            }
        };

        let matcher_config = MatcherConfig {
            similarity_threshold: config.similarity_threshold,
            record_matches: config.record_matches,
            ..MatcherConfig::default()
        };
        let matcher = Matcher::new(Arc::new(Registry::new(store)), matcher_config)?;

        Ok(Self {
            matcher: Arc::new(matcher),
            admin_token: config.admin_token.as_deref().map(Arc::from),
            max_file_size: config.max_file_size(),
        })
    }

    /// Require `token` on the admin routes.
    pub fn with_admin_token(mut self, token: impl AsRef<str>) -> Self {
        self.admin_token = Some(Arc::from(token.as_ref()));
        self
    }

    /// Override the upload size limit.
    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// The registry behind the matcher.
    pub fn registry(&self) -> &Arc<Registry> {
        self.matcher.registry()
    }
}
