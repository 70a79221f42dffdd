//! Raw model of the polled world feed.
//!
//! Mirrors the JSON documents served by the network's data endpoints: the
//! main snapshot (`general`, `pilots`, `controllers`, `atis`) and the
//! transceiver list. Only fields the relay derives from are modelled;
//! unknown fields are ignored on deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One poll of the main data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    /// Feed-wide metadata, including the authoritative update timestamp.
    pub general: FeedGeneral,
    /// Connected pilots.
    #[serde(default)]
    pub pilots: Vec<FeedPilot>,
    /// Connected controllers.
    #[serde(default)]
    pub controllers: Vec<FeedController>,
    /// ATIS stations. Treated as controllers by the relay.
    #[serde(default)]
    pub atis: Vec<FeedController>,
}

/// The `general` block of a feed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedGeneral {
    /// Feed format version.
    #[serde(default)]
    pub version: u32,
    /// Time the feed was generated. Ingestion skips cycles where this does
    /// not advance.
    pub update_timestamp: DateTime<Utc>,
    /// Total connected clients.
    #[serde(default)]
    pub connected_clients: u32,
    /// Distinct users behind those clients.
    #[serde(default)]
    pub unique_users: u32,
}

/// A pilot as reported by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPilot {
    /// Network member id.
    pub cid: u64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Radio callsign.
    pub callsign: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude above mean sea level in feet.
    pub altitude: i32,
    /// Ground speed in knots.
    pub groundspeed: i32,
    /// Squawk code.
    #[serde(default)]
    pub transponder: String,
    /// Heading in degrees.
    pub heading: i32,
    /// Filed flight plan, if any.
    #[serde(default)]
    pub flight_plan: Option<FeedFlightPlan>,
    /// Time the pilot connected.
    pub logon_time: DateTime<Utc>,
    /// Time of the pilot's last position report.
    pub last_updated: DateTime<Utc>,
}

/// A filed flight plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFlightPlan {
    /// `I` or `V`.
    #[serde(default)]
    pub flight_rules: String,
    /// Short aircraft type designator, e.g. `B738`.
    #[serde(default)]
    pub aircraft_short: String,
    /// Departure ICAO code.
    #[serde(default)]
    pub departure: String,
    /// Arrival ICAO code.
    #[serde(default)]
    pub arrival: String,
}

/// A controller or ATIS station as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedController {
    /// Network member id.
    pub cid: u64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Radio callsign, e.g. `KJFK_TWR`.
    pub callsign: String,
    /// Primary frequency, e.g. `119.100`.
    #[serde(default)]
    pub frequency: String,
    /// Facility type code.
    #[serde(default)]
    pub facility: i32,
    /// Controller rating code.
    #[serde(default)]
    pub rating: i32,
    /// ATIS or controller info lines.
    #[serde(default)]
    pub text_atis: Option<Vec<String>>,
    /// Time the station connected.
    pub logon_time: DateTime<Utc>,
    /// Time of the station's last update.
    pub last_updated: DateTime<Utc>,
}

/// The radios of one connected client, from the transceiver feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransceiverEntry {
    /// Callsign owning the radios.
    pub callsign: String,
    /// Individual radios.
    #[serde(default)]
    pub transceivers: Vec<Transceiver>,
}

/// One radio. Heights are in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transceiver {
    /// Radio index.
    #[serde(default)]
    pub id: u32,
    /// Tuned frequency in hertz.
    pub frequency: u64,
    /// Latitude in degrees.
    #[serde(default)]
    pub lat_deg: f64,
    /// Longitude in degrees.
    #[serde(default)]
    pub lon_deg: f64,
    /// Height above mean sea level in metres.
    #[serde(default)]
    pub height_msl_m: f64,
    /// Height above ground level in metres.
    #[serde(default)]
    pub height_agl_m: f64,
}
