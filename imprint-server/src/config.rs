//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use imprint_core::NEAR_DUPLICATE_THRESHOLD;

/// Default registry file used when neither `REGISTRY_URL` nor `REGISTRY_PATH` is set.
pub const DEFAULT_REGISTRY_PATH: &str = "data/registry.json";

/// Where the registry snapshot lives.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryBackend {
    /// Process-local, lost on restart (tests)
    Memory,
    /// JSON document on local disk
    File(PathBuf),
    /// JSON document behind GET/PUT
    Http {
        url: String,
        bearer_token: Option<String>,
        timeout: Duration,
    },
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Registry snapshot backend
    pub registry: RegistryBackend,
    /// Minimum similarity (percent) for a perceptual match (default: 75.0)
    pub similarity_threshold: f64,
    /// Record match statistics on matched entries (default: true)
    pub record_matches: bool,
    /// Bearer token guarding the admin routes; admin routes are open when unset
    pub admin_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            registry: RegistryBackend::Memory,
            similarity_threshold: NEAR_DUPLICATE_THRESHOLD,
            record_matches: true,
            admin_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|h| h.parse::<Ipv4Addr>().ok())
            .map(|ip| ip.octets())
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let record_matches = std::env::var("RECORD_MATCHES")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(defaults.record_matches);

        let similarity_threshold = env_parse::<f64>("SIMILARITY_THRESHOLD")
            .filter(|t| (0.0..=100.0).contains(t))
            .unwrap_or(defaults.similarity_threshold);

        let admin_token = non_empty_var("ADMIN_TOKEN");

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB").unwrap_or(defaults.body_limit_mb),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB").unwrap_or(defaults.max_file_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            registry: registry_backend_from_env(),
            similarity_threshold,
            record_matches,
            admin_token,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Maximum upload size in bytes
    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// `REGISTRY_URL` wins over `REGISTRY_PATH`; the default is a local file.
fn registry_backend_from_env() -> RegistryBackend {
    if let Some(url) = non_empty_var("REGISTRY_URL") {
        let timeout_secs = env_parse("REGISTRY_TIMEOUT_SECS").unwrap_or(10);
        return RegistryBackend::Http {
            url,
            bearer_token: non_empty_var("REGISTRY_TOKEN"),
            timeout: Duration::from_secs(timeout_secs),
        };
    }

    let path = non_empty_var("REGISTRY_PATH").unwrap_or_else(|| DEFAULT_REGISTRY_PATH.into());
    RegistryBackend::File(PathBuf::from(path))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.registry, RegistryBackend::Memory);
        assert_eq!(config.similarity_threshold, 75.0);
        assert!(config.admin_token.is_none());
        assert!(!config.rate_limit_enabled);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            host: [0, 0, 0, 0],
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_max_file_size_in_bytes() {
        let config = Config {
            max_file_size_mb: 2,
            ..Config::default()
        };
        assert_eq!(config.max_file_size(), 2 * 1024 * 1024);
    }
}
