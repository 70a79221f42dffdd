//! Publishing seam between the ingestion loop and the broker.

use std::fmt;
use std::future::Future;

use bytes::Bytes;

/// The two channels frames are published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Complete world state for late joiners.
    Snapshot,
    /// Per-cycle changes.
    Delta,
}

impl Channel {
    /// Every channel.
    pub const ALL: [Self; 2] = [Self::Snapshot, Self::Delta];

    /// Broker subject or channel name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Snapshot => "skywire.snapshot",
            Self::Delta => "skywire.delta",
        }
    }

    /// Channel for a broker subject name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.name() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while publishing a frame.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The broker rejected or failed to accept the payload.
    #[error("publish to {channel} failed: {source}")]
    Broker {
        /// Channel the payload was bound for.
        channel: Channel,
        /// The underlying broker error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Hands frames to a broker.
///
/// Publishing is at-most-once: success means the broker accepted the
/// payload, not that any subscriber received it.
pub trait Publisher {
    /// Publish `payload` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the broker hand-off fails.
    fn publish(
        &self,
        channel: Channel,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}
