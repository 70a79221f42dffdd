//! Error types for the ingestion binary.

/// Top-level error for the ingestion binary.
///
/// Wraps each startup failure so `main` can propagate with `?`. Cycle
/// failures never surface here; the loop logs them and retries on the
/// next tick.
#[derive(Debug, thiserror::Error)]
pub enum IngestAppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: skywire_core::ConfigError,
    },

    /// The broker could not be reached.
    #[error("broker error: {source}")]
    Broker {
        /// The underlying broker error.
        #[from]
        source: skywire_broker::BrokerError,
    },

    /// The HTTP client could not be built.
    #[error("feed client error: {source}")]
    Feed {
        /// The underlying feed error.
        #[from]
        source: skywire_core::FeedError,
    },
}
