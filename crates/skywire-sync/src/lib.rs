//! Client-side synchronizer for Skywire.
//!
//! Rebuilds the relayed world on the client from a snapshot fetched over
//! HTTP and the stream of compressed delta frames from the fan-out socket.
//!
//! # Modules
//!
//! - [`mirror`] -- The mirrored world and delta application.
//! - [`frame`] -- Decompression and decoding of frames.
//! - [`source`] -- [`SnapshotSource`] and its HTTP implementation.
//! - [`synchronizer`] -- Status tracking, frame buffering, and resync.
//! - [`error`] -- [`SyncError`].
//!
//! [`SnapshotSource`]: source::SnapshotSource
//! [`SyncError`]: error::SyncError

pub mod error;
pub mod frame;
pub mod mirror;
pub mod source;
pub mod synchronizer;

pub use error::SyncError;
pub use frame::{decode_frame, decode_snapshot};
pub use mirror::{ApplyOutcome, Mirror, MirrorPilot};
pub use source::{HttpSnapshotSource, SnapshotSource};
pub use synchronizer::{FrameOutcome, PENDING_LIMIT, SyncStatus, Synchronizer};
