//! Error types for the broker layer.
//!
//! All errors are propagated via [`BrokerError`], which wraps the
//! underlying [`fred`] errors and flattens `async-nats` errors into
//! messages naming the operation that failed.

/// Errors that can occur in the broker layer.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// A Redis or Dragonfly operation failed.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// A NATS operation failed.
    #[error("NATS error: {0}")]
    Nats(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
