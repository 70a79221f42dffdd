//! Frames carried over the broker and the fan-out sockets.
//!
//! A [`WsDelta`] describes one ingestion cycle as added, updated, and
//! removed partitions per collection. A [`SnapshotFrame`] is the complete
//! world for clients that are joining or resynchronising.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skywire_codec::{TrackPoint, TrackRecord};
use ts_rs::TS;

use crate::entities::{Airport, Controller, PilotDetails};
use crate::ids::{AirportCode, Callsign};

/// Added, updated, and removed members of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CollectionDiff<K, A, U> {
    /// Entities present now but not last cycle.
    pub added: Vec<A>,
    /// Entities present in both cycles whose state changed.
    pub updated: Vec<U>,
    /// Keys of entities present last cycle but not now.
    pub removed: Vec<K>,
}

impl<K, A, U> CollectionDiff<K, A, U> {
    /// Whether no partition has any member.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Total members across all partitions.
    pub fn len(&self) -> usize {
        self.added
            .len()
            .saturating_add(self.updated.len())
            .saturating_add(self.removed.len())
    }
}

impl<K, A, U> Default for CollectionDiff<K, A, U> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// A pilot with its full track. Used for added pilots and snapshots, so a
/// delta can never appear where no baseline exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PilotEntry {
    /// Radio callsign.
    pub callsign: Callsign,
    /// Base64 of the 25-byte full record.
    #[serde(with = "skywire_codec::full_record")]
    #[ts(as = "String")]
    pub track: TrackPoint,
    /// Slow-changing attributes.
    pub details: PilotDetails,
}

/// Changes to a pilot that was already present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PilotUpdate {
    /// Radio callsign.
    pub callsign: Callsign,
    /// Track record, absent when suppressed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "{ f: string } | { d: string } | null")]
    pub track: Option<TrackRecord>,
    /// New attributes, absent when unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<PilotDetails>,
}

impl PilotUpdate {
    /// Whether the update carries nothing.
    pub const fn is_empty(&self) -> bool {
        self.track.is_none() && self.details.is_none()
    }
}

/// Pilot partition of a [`WsDelta`].
pub type PilotDiff = CollectionDiff<Callsign, PilotEntry, PilotUpdate>;
/// Controller partition of a [`WsDelta`].
pub type ControllerDiff = CollectionDiff<Callsign, Controller, Controller>;
/// Airport partition of a [`WsDelta`].
pub type AirportDiff = CollectionDiff<AirportCode, Airport, Airport>;

/// One cycle's changes, published on the delta channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WsDelta {
    /// Feed timestamp of the cycle.
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    /// Pilot changes.
    pub pilots: PilotDiff,
    /// Controller changes.
    pub controllers: ControllerDiff,
    /// Airport changes.
    pub airports: AirportDiff,
}

impl WsDelta {
    /// A delta at `timestamp` with no changes.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            pilots: CollectionDiff::default(),
            controllers: CollectionDiff::default(),
            airports: CollectionDiff::default(),
        }
    }

    /// Whether no collection changed.
    pub fn is_empty(&self) -> bool {
        self.pilots.is_empty() && self.controllers.is_empty() && self.airports.is_empty()
    }
}

/// The complete world, published on the snapshot channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SnapshotFrame {
    /// Feed timestamp of the world.
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    /// Every pilot with a full track.
    pub pilots: Vec<PilotEntry>,
    /// Every controller.
    pub controllers: Vec<Controller>,
    /// Every airport.
    pub airports: Vec<Airport>,
}
