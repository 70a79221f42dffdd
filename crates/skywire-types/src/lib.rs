//! Shared type definitions for Skywire.
//!
//! The raw feed model is what the ingestion loop fetches; entities are what
//! it derives; frames are what travels over the broker and the sockets.
//! Frame and entity types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe callsign and airport code wrappers
//! - [`feed`] -- Raw feed and transceiver documents
//! - [`entities`] -- Pilots, controllers, airports, and the world state
//! - [`frames`] -- Collection diffs, `WsDelta`, and snapshot frames

pub mod entities;
pub mod feed;
pub mod frames;
pub mod ids;

pub use entities::{Airport, Controller, Pilot, PilotDetails, WorldState};
pub use feed::{
    FeedController, FeedFlightPlan, FeedGeneral, FeedPilot, FeedSnapshot, Transceiver,
    TransceiverEntry,
};
pub use frames::{
    AirportDiff, CollectionDiff, ControllerDiff, PilotDiff, PilotEntry, PilotUpdate,
    SnapshotFrame, WsDelta,
};
pub use ids::{AirportCode, Callsign};
