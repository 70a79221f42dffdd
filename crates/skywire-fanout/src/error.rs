//! Error types for the fan-out server.
//!
//! [`FanoutError`] covers the relay and the HTTP layer and converts into
//! an Axum response via its [`IntoResponse`] implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the fan-out server.
#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    /// No snapshot has been received from the broker yet.
    #[error("no snapshot available yet")]
    SnapshotUnavailable,

    /// A frame could not be compressed.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),
}

impl IntoResponse for FanoutError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::SnapshotUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Compression(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
