//! Keeps a [`Mirror`] in step with a fan-out server.
//!
//! The synchronizer starts out waiting for a snapshot. Frames that arrive
//! before [`Synchronizer::resync`] completes are held back and replayed on
//! top of the snapshot, skipping those the snapshot already covers. Once
//! live, any frame that fails to decode or does not fit the mirror puts
//! the synchronizer in [`SyncStatus::Desynced`] until the next resync.

use std::collections::VecDeque;
use std::mem;

use chrono::{DateTime, Utc};
use skywire_types::WsDelta;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::frame::decode_frame;
use crate::mirror::{ApplyOutcome, Mirror};
use crate::source::SnapshotSource;

/// Frames held back while no usable snapshot is resident.
pub const PENDING_LIMIT: usize = 64;

/// Where the synchronizer stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No snapshot has been applied yet.
    AwaitingSnapshot,
    /// The mirror tracks the server.
    Live,
    /// A frame did not fit; a resync is required.
    Desynced,
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was applied to the mirror.
    Applied,
    /// The frame was not newer than the mirror.
    Stale,
    /// The frame was held back until the next resync.
    Buffered,
}

/// Client-side synchronizer over a [`SnapshotSource`].
#[derive(Debug)]
pub struct Synchronizer<S> {
    source: S,
    mirror: Mirror,
    status: SyncStatus,
    pending: VecDeque<WsDelta>,
    dropped_through: Option<DateTime<Utc>>,
}

impl<S: SnapshotSource> Synchronizer<S> {
    /// A synchronizer awaiting its first snapshot.
    pub fn new(source: S) -> Self {
        Self {
            source,
            mirror: Mirror::new(),
            status: SyncStatus::AwaitingSnapshot,
            pending: VecDeque::new(),
            dropped_through: None,
        }
    }

    /// Current status.
    pub const fn status(&self) -> SyncStatus {
        self.status
    }

    /// The mirrored world.
    pub const fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// The snapshot source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Handle one compressed frame from the socket.
    ///
    /// # Errors
    ///
    /// Returns the decode or apply error; the status is then
    /// [`SyncStatus::Desynced`].
    pub fn on_frame(&mut self, frame: &[u8]) -> Result<FrameOutcome, SyncError> {
        match decode_frame(frame) {
            Ok(delta) => self.on_delta(delta),
            Err(e) => Err(self.desync(e)),
        }
    }

    /// Handle one decoded delta.
    ///
    /// # Errors
    ///
    /// Same as [`Synchronizer::on_frame`].
    pub fn on_delta(&mut self, delta: WsDelta) -> Result<FrameOutcome, SyncError> {
        if self.status != SyncStatus::Live {
            self.hold(delta);
            return Ok(FrameOutcome::Buffered);
        }
        match self.mirror.apply_delta(&delta) {
            Ok(ApplyOutcome::Applied) => Ok(FrameOutcome::Applied),
            Ok(ApplyOutcome::Stale) => {
                debug!(timestamp = %delta.timestamp, "stale delta ignored");
                Ok(FrameOutcome::Stale)
            }
            Err(e) => Err(self.desync(e)),
        }
    }

    /// Fetch a fresh snapshot, replace the mirror, and replay held frames.
    ///
    /// # Errors
    ///
    /// Returns the source's error with the status unchanged, or
    /// [`SyncError::SnapshotBehind`] / an apply error with the status
    /// [`SyncStatus::Desynced`].
    pub async fn resync(&mut self) -> Result<(), SyncError> {
        let frame = self.source.fetch_snapshot().await?;
        let snapshot = frame.timestamp;

        if let Some(dropped_through) = self.dropped_through.filter(|dropped| *dropped > snapshot) {
            return Err(self.desync(SyncError::SnapshotBehind {
                snapshot,
                dropped_through,
            }));
        }

        self.mirror.apply_full(frame);
        self.status = SyncStatus::Live;
        self.dropped_through = None;

        let pending = mem::take(&mut self.pending);
        let held = pending.len();
        for delta in pending {
            if let Err(e) = self.mirror.apply_delta(&delta) {
                return Err(self.desync(e));
            }
        }

        info!(
            %snapshot,
            pilots = self.mirror.pilots().len(),
            replayed = held,
            "mirror resynchronised"
        );
        Ok(())
    }

    fn hold(&mut self, delta: WsDelta) {
        while self.pending.len() >= PENDING_LIMIT {
            let Some(dropped) = self.pending.pop_front() else {
                break;
            };
            self.dropped_through = Some(dropped.timestamp);
        }
        self.pending.push_back(delta);
    }

    fn desync(&mut self, err: SyncError) -> SyncError {
        warn!(error = %err, "mirror desynchronised, resync required");
        self.status = SyncStatus::Desynced;
        self.pending.clear();
        self.dropped_through = None;
        err
    }
}
