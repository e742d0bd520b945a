//! Image retrieval.
//!
//! The localizer only needs "give me the bytes at this URL". [`HttpFetcher`]
//! does that over HTTPS; [`MemoryFetcher`] serves canned responses so the
//! pipeline can be exercised without a network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("GET {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url}: {reason}")]
    Unavailable { url: String, reason: String },
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches over HTTP(S). One client per run; no retries and no timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let http = |source: reqwest::Error| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http)?;
        let bytes = response.bytes().await.map_err(http)?;
        log::debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// In-memory fetcher with canned responses.
///
/// Unknown URLs fail. Every request is recorded, in call order, so callers
/// can assert what was (and was not) downloaded.
///
/// ```
/// use wikisite::fetch::{Fetcher, MemoryFetcher};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = MemoryFetcher::new()
///     .with_image("https://example.com/a.png", b"PNG")
///     .with_failure("https://example.com/gone.png", "404 Not Found");
/// assert_eq!(fetcher.fetch("https://example.com/a.png").await.unwrap(), b"PNG");
/// assert!(fetcher.fetch("https://example.com/gone.png").await.is_err());
/// assert_eq!(fetcher.calls().len(), 2);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    responses: HashMap<String, Result<Vec<u8>, String>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_string(), Ok(bytes.into()));
        self
    }

    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.responses
            .insert(url.to_string(), Err(reason.to_string()));
        self
    }

    /// Hold the response for `url` back by `delay`.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// URLs requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        match self.responses.get(url) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(reason)) => Err(FetchError::Unavailable {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            None => Err(FetchError::Unavailable {
                url: url.to_string(),
                reason: "no canned response".to_string(),
            }),
        }
    }
}
