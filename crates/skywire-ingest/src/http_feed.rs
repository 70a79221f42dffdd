//! HTTP client for the world feed endpoints.

use std::time::Duration;

use serde::de::DeserializeOwned;
use skywire_core::config::FeedConfig;
use skywire_core::{FeedError, FeedSource};
use skywire_types::{FeedSnapshot, TransceiverEntry};
use tracing::debug;

/// User agent sent with every feed request.
const USER_AGENT: &str = concat!("skywire-ingest/", env!("CARGO_PKG_VERSION"));

/// [`FeedSource`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    data_url: String,
    transceivers_url: String,
}

impl HttpFeed {
    /// Build a client for the endpoints in `config`.
    ///
    /// Every request is bounded by `request_timeout_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the TLS backend cannot be initialised.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeedError::Http {
                url: config.data_url.clone(),
                source: Box::new(e),
            })?;
        Ok(Self {
            client,
            data_url: config.data_url.clone(),
            transceivers_url: config.transceivers_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Http {
                url: url.to_owned(),
                source: Box::new(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FeedError::Http {
            url: url.to_owned(),
            source: Box::new(e),
        })?;
        debug!(url, bytes = body.len(), "feed document fetched");

        serde_json::from_slice(&body).map_err(|source| FeedError::Parse {
            url: url.to_owned(),
            source,
        })
    }
}

impl FeedSource for HttpFeed {
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot, FeedError> {
        self.get_json(&self.data_url).await
    }

    async fn fetch_transceivers(&self) -> Result<Vec<TransceiverEntry>, FeedError> {
        self.get_json(&self.transceivers_url).await
    }
}
