//! Source of raw feed documents.
//!
//! The ingestion loop only sees this trait; the HTTP client lives in the
//! ingest binary and tests substitute scripted sources.

use std::future::Future;

use skywire_types::{FeedSnapshot, TransceiverEntry};

/// Errors that can occur while fetching feed documents.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The request did not complete.
    #[error("feed request to {url} failed: {source}")]
    Http {
        /// Endpoint that was requested.
        url: String,
        /// The underlying transport error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The endpoint answered with a non-success status.
    #[error("feed endpoint {url} returned status {status}")]
    Status {
        /// Endpoint that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The body was not a valid feed document.
    #[error("failed to parse feed document from {url}: {source}")]
    Parse {
        /// Endpoint that was requested.
        url: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// A source of feed snapshots and transceiver lists.
pub trait FeedSource {
    /// Fetch the current main feed document.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the document cannot be fetched or parsed.
    fn fetch_snapshot(&self) -> impl Future<Output = Result<FeedSnapshot, FeedError>> + Send;

    /// Fetch the current transceiver document.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the document cannot be fetched or parsed.
    fn fetch_transceivers(
        &self,
    ) -> impl Future<Output = Result<Vec<TransceiverEntry>, FeedError>> + Send;
}
