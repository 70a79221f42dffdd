//! Shared application state for the fan-out server.
//!
//! [`AppState`] holds the socket registry and the latest compressed
//! snapshot. The relay task writes both; handlers only read.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::registry::ConnectionRegistry;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server is answering.
    pub status: &'static str,
    /// Currently connected sockets.
    pub connections: usize,
    /// Whether a snapshot has been cached.
    pub has_snapshot: bool,
    /// Delta frames broadcast since startup.
    pub deltas_relayed: u64,
}

/// Shared state for all handlers and the relay task.
#[derive(Debug)]
pub struct AppState {
    /// Connected sockets.
    pub registry: ConnectionRegistry,
    snapshot: RwLock<Option<Bytes>>,
    deltas_relayed: AtomicU64,
}

impl AppState {
    /// Create state whose sockets queue up to `socket_buffer` frames.
    pub fn new(socket_buffer: usize) -> Self {
        Self {
            registry: ConnectionRegistry::new(socket_buffer),
            snapshot: RwLock::new(None),
            deltas_relayed: AtomicU64::new(0),
        }
    }

    /// Replace the cached gzip snapshot.
    pub async fn set_snapshot(&self, frame: Bytes) {
        *self.snapshot.write().await = Some(frame);
    }

    /// The cached gzip snapshot, if one has arrived.
    pub async fn snapshot(&self) -> Option<Bytes> {
        self.snapshot.read().await.clone()
    }

    /// Count one broadcast delta frame.
    pub fn record_delta(&self) {
        self.deltas_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Current health summary.
    pub async fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok",
            connections: self.registry.len().await,
            has_snapshot: self.snapshot.read().await.is_some(),
            deltas_relayed: self.deltas_relayed.load(Ordering::Relaxed),
        }
    }
}
