//! Registry of connected sockets.
//!
//! Each socket owns a bounded queue. [`ConnectionRegistry::broadcast`]
//! pushes a frame to every queue without waiting; a socket whose queue is
//! full or closed is removed from the registry on the spot. Dropping the
//! registry's sender ends that socket's task, which closes the connection.
//! Other sockets are unaffected, and nothing is buffered for sockets that
//! connect later.

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifier of one connected socket (UUID v7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sockets the frame was queued for.
    pub delivered: usize,
    /// Sockets removed because their queue was full or closed.
    pub dropped: usize,
}

/// Connected sockets and their outbound queues.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Mutex<BTreeMap<ConnectionId, mpsc::Sender<Bytes>>>,
    buffer: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry whose sockets queue up to `buffer` frames.
    ///
    /// A `buffer` of zero is raised to one.
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: Mutex::new(BTreeMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a socket, returning its id and the receiving end of its queue.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = ConnectionId::new();
        self.connections.lock().await.insert(id, tx);
        (id, rx)
    }

    /// Remove a socket. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        self.connections.lock().await.remove(&id).is_some()
    }

    /// Queue `frame` for every registered socket.
    pub async fn broadcast(&self, frame: &Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        self.connections
            .lock()
            .await
            .retain(|id, tx| match tx.try_send(frame.clone()) {
                Ok(()) => {
                    report.delivered = report.delivered.saturating_add(1);
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %id, "socket queue full, dropping slow consumer");
                    report.dropped = report.dropped.saturating_add(1);
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(connection = %id, "socket already closed, removing");
                    report.dropped = report.dropped.saturating_add(1);
                    false
                }
            });
        report
    }

    /// Number of registered sockets.
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Whether no sockets are registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }
}
