//! HTTP handlers for the fan-out server.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::FanoutError;
use crate::state::{AppState, HealthResponse};

/// Serve the latest snapshot, still gzip-compressed.
///
/// # Route
///
/// `GET /api/snapshot`
///
/// # Errors
///
/// Returns [`FanoutError::SnapshotUnavailable`] (503) until the first
/// snapshot arrives from the broker.
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Result<Response, FanoutError> {
    let frame = state
        .snapshot()
        .await
        .ok_or(FanoutError::SnapshotUnavailable)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        frame,
    )
        .into_response())
}

/// Liveness and relay status.
///
/// # Route
///
/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(state.health().await)
}
