//! Error types for the client-side synchronizer.

use chrono::{DateTime, Utc};
use skywire_codec::CodecError;
use skywire_types::Callsign;

/// Errors that put the mirror out of step with the server.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A frame was not valid gzip.
    #[error("failed to decompress frame: {0}")]
    Decompress(#[from] std::io::Error),

    /// A frame was not a valid JSON document of the expected shape.
    #[error("failed to parse frame: {0}")]
    Json(#[from] serde_json::Error),

    /// A track record could not be applied.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An update arrived for a pilot with no resident full record.
    #[error("no baseline for pilot {callsign}")]
    MissingBaseline {
        /// The pilot the update was for.
        callsign: Callsign,
    },

    /// Deltas newer than the fetched snapshot were dropped while waiting
    /// for it, so the snapshot cannot be brought up to date.
    #[error("snapshot at {snapshot} is older than dropped deltas up to {dropped_through}")]
    SnapshotBehind {
        /// Timestamp of the fetched snapshot.
        snapshot: DateTime<Utc>,
        /// Timestamp of the newest dropped delta.
        dropped_through: DateTime<Utc>,
    },

    /// The snapshot request did not complete.
    #[error("snapshot request to {url} failed: {source}")]
    Http {
        /// Endpoint that was requested.
        url: String,
        /// The underlying transport error.
        source: reqwest::Error,
    },

    /// The snapshot endpoint answered with a non-success status.
    #[error("snapshot endpoint {url} returned status {status}")]
    Status {
        /// Endpoint that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
    },
}
