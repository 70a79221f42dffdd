//! Derived world entities held by the ingestion loop.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skywire_codec::{Lifecycle, TrackPoint};
use ts_rs::TS;

use crate::frames::{PilotEntry, SnapshotFrame};
use crate::ids::{AirportCode, Callsign};

// =============================================================================
// Pilots
// =============================================================================

/// Slow-changing pilot attributes sent alongside the track.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PilotDetails {
    /// Network member id.
    pub cid: u64,
    /// Display name.
    pub name: String,
    /// Aircraft type designator from the flight plan.
    pub aircraft: Option<String>,
    /// Departure airport from the flight plan.
    pub departure: Option<AirportCode>,
    /// Arrival airport from the flight plan.
    pub arrival: Option<AirportCode>,
    /// Squawk code.
    pub transponder: String,
    /// Tuned frequencies in hertz, from the transceiver feed.
    pub frequencies: Vec<u64>,
}

/// A pilot as derived for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pilot {
    /// Radio callsign.
    pub callsign: Callsign,
    /// Derived telemetry.
    pub track: TrackPoint,
    /// Slow-changing attributes.
    pub details: PilotDetails,
    /// Lifecycle position this cycle.
    pub lifecycle: Lifecycle,
    /// Feed altitude in feet before rounding, kept for vertical speed.
    pub raw_altitude: i32,
    /// Time of the pilot's last position report.
    pub last_updated: DateTime<Utc>,
}

impl Pilot {
    /// The pilot as it appears in a snapshot or the added partition.
    pub fn entry(&self) -> PilotEntry {
        PilotEntry {
            callsign: self.callsign.clone(),
            track: self.track,
            details: self.details.clone(),
        }
    }
}

// =============================================================================
// Controllers and airports
// =============================================================================

/// A staffed controller or ATIS position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Controller {
    /// Radio callsign.
    pub callsign: Callsign,
    /// Network member id.
    pub cid: u64,
    /// Display name.
    pub name: String,
    /// Primary frequency.
    pub frequency: String,
    /// Facility type code.
    pub facility: i32,
    /// Controller rating code.
    pub rating: i32,
    /// ATIS or controller info lines.
    pub text_atis: Vec<String>,
    /// Time the position was opened.
    #[ts(as = "String")]
    pub logon_time: DateTime<Utc>,
}

/// Traffic and staffing at one airport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Airport {
    /// ICAO code.
    pub icao: AirportCode,
    /// Pilots with a flight plan departing here.
    pub departures: u32,
    /// Pilots with a flight plan arriving here.
    pub arrivals: u32,
    /// Controllers staffing the airport, ordered by callsign.
    pub controllers: Vec<Callsign>,
}

impl Airport {
    /// An airport with no traffic or staffing yet.
    pub const fn new(icao: AirportCode) -> Self {
        Self {
            icao,
            departures: 0,
            arrivals: 0,
            controllers: Vec::new(),
        }
    }
}

// =============================================================================
// World
// =============================================================================

/// The whole derived world at one feed timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldState {
    /// Feed timestamp the world was derived from.
    pub update_timestamp: DateTime<Utc>,
    /// Pilots by callsign.
    pub pilots: BTreeMap<Callsign, Pilot>,
    /// Controllers by callsign.
    pub controllers: BTreeMap<Callsign, Controller>,
    /// Airports by ICAO code.
    pub airports: BTreeMap<AirportCode, Airport>,
}

impl WorldState {
    /// An empty world at `update_timestamp`.
    pub const fn empty(update_timestamp: DateTime<Utc>) -> Self {
        Self {
            update_timestamp,
            pilots: BTreeMap::new(),
            controllers: BTreeMap::new(),
            airports: BTreeMap::new(),
        }
    }

    /// Full-state frame for late joiners.
    pub fn snapshot_frame(&self) -> SnapshotFrame {
        SnapshotFrame {
            timestamp: self.update_timestamp,
            pilots: self.pilots.values().map(Pilot::entry).collect(),
            controllers: self.controllers.values().cloned().collect(),
            airports: self.airports.values().cloned().collect(),
        }
    }
}
