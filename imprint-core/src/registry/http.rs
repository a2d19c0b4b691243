//! Registry document kept behind an HTTP endpoint (blob storage or similar).
//!
//! The document is fetched with `GET` and replaced with `PUT`. A `404` means
//! nothing has been stored yet. Every other failure is surfaced as a
//! [`ImprintError::StorageError`]; requests are never retried here, so a
//! caller can tell an unreachable registry apart from an empty one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, instrument, warn};

use super::store::SnapshotStore;
use crate::error::{ImprintError, Result};

/// Default bound on a single registry request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot store backed by an HTTP resource.
pub struct HttpSnapshotStore {
    client: Client,
    url: String,
    bearer_token: Option<String>,
}

impl HttpSnapshotStore {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    #[instrument(level = "debug", skip_all, fields(timeout_ms = timeout.as_millis() as u64))]
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            bearer_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn request_error(&self, method: &str, err: reqwest::Error) -> ImprintError {
        let kind = if err.is_timeout() {
            "timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        warn!(method, url = %self.url, error = %err, "Registry request {kind}");
        ImprintError::StorageError(format!("{method} {} {kind}: {err}", self.url))
    }
}

#[async_trait]
impl SnapshotStore for HttpSnapshotStore {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        let response = self
            .authorize(self.client.get(&self.url))
            .send()
            .await
            .map_err(|e| self.request_error("GET", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url = %self.url, "Registry document not found; starting empty");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ImprintError::StorageError(format!(
                "GET {} returned {status}",
                self.url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error("GET", e))?;
        Ok(Some(body.to_vec()))
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        let response = self
            .authorize(self.client.put(&self.url))
            .header(header::CONTENT_TYPE, "application/json")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| self.request_error("PUT", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImprintError::StorageError(format!(
                "PUT {} returned {status}",
                self.url
            )));
        }

        debug!(url = %self.url, bytes = bytes.len(), "Registry document uploaded");
        Ok(())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port.
    async fn one_shot_server(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/registry.json")
    }

    #[tokio::test]
    async fn test_not_found_is_empty() {
        let url = one_shot_server(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let store = HttpSnapshotStore::new(url).unwrap();
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reads_document() {
        let url = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
        )
        .await;
        let store = HttpSnapshotStore::new(url).unwrap();
        assert_eq!(store.read().await.unwrap(), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_server_error_is_storage_error() {
        let url = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let store = HttpSnapshotStore::new(url).unwrap();
        let err = store.read().await.unwrap_err();
        assert!(matches!(err, ImprintError::StorageError(_)));
        assert!(err.is_undetermined());
    }

    #[tokio::test]
    async fn test_unreachable_is_storage_error() {
        // Bind then drop to get a port with nothing listening.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let store =
            HttpSnapshotStore::with_timeout(format!("http://{addr}/r.json"), Duration::from_secs(2))
                .unwrap();
        assert!(matches!(
            store.write(b"{}").await,
            Err(ImprintError::StorageError(_))
        ));
    }
}
