//! Snapshot fetching from the aggregation backend
//!
//! One request per call, no internal retry. The next scheduled tick is the retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use super::types::{ApiResponse, Snapshot};

/// Path of the monitoring endpoint, relative to the backend base URL
pub const DATA_PATH: &str = "/api/data";

/// Message used when the backend reports failure without saying why
pub const UNKNOWN_ERROR: &str = "unknown";

/// All errors a single fetch can end with
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FetchError {
    /// The backend answered and flagged the request as failed
    #[error("backend error: {0}")]
    Reported(String),

    /// The request could not be completed, or the body could not be parsed
    #[error("request failed: {0}")]
    Transport(String),
}

impl FetchError {
    pub fn detail(&self) -> &str {
        match self {
            FetchError::Reported(message) | FetchError::Transport(message) => message,
        }
    }
}

/// Source of monitoring snapshots
#[async_trait]
pub trait SnapshotFetcher: Send + Sync + 'static {
    async fn fetch(&self, window_seconds: u64) -> Result<Snapshot, FetchError>;
}

/// Classify a response body into a snapshot or a reported failure
pub fn parse_snapshot(body: &str) -> Result<Snapshot, FetchError> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Transport(format!("invalid response body: {}", e)))?;

    if !response.ok {
        let message = response
            .error
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        return Err(FetchError::Reported(message));
    }

    Ok(Snapshot::new(
        response.items.unwrap_or_default(),
        response.updated.unwrap_or_default(),
    ))
}

/// HTTP fetcher for `GET <base>/api/data?window=<seconds>`
#[derive(Debug, Clone)]
pub struct HttpSnapshotFetcher {
    client: Client,
    endpoint: Url,
}

impl HttpSnapshotFetcher {
    /// Build a fetcher against `base_url` with the transport-level `timeout`
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("HTTP client init failed: {}", e)))?;
        let endpoint = base_url
            .join(DATA_PATH)
            .map_err(|e| FetchError::Transport(format!("invalid endpoint: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch(&self, window_seconds: u64) -> Result<Snapshot, FetchError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("window", window_seconds)])
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FetchError::Transport(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("reading body failed: {}", e)))?;

        parse_snapshot(&body)
    }
}
