//! Derivation of the world state from one feed poll.
//!
//! Turns the raw feed and transceiver documents into [`WorldState`]:
//! projected tracks, rounded altitudes, vertical speed against the previous
//! world, display colors, lifecycle positions, and airport occupancy.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use skywire_codec::{Color, Lifecycle, TrackPoint, round_altitude};
use skywire_types::{
    Airport, AirportCode, Callsign, Controller, FeedController, FeedPilot, FeedSnapshot, Pilot,
    PilotDetails, Transceiver, TransceiverEntry, WorldState,
};
use tracing::{debug, warn};

use crate::projection::to_web_mercator;

/// Feet per meter.
const FEET_PER_METER: f64 = 3.280_839_895;

/// Below this ground speed in knots a pilot is drawn as on the ground.
const GROUND_SPEED_KT: i32 = 50;

/// Facility codes that staff an airport (delivery, ground, tower, approach).
const AIRPORT_FACILITIES: std::ops::RangeInclusive<i32> = 2..=5;

// =============================================================================
// Colors
// =============================================================================

/// Color for a pilot on the ground.
pub const GROUND_COLOR: Color = Color::from_packed(0x009e_9e9e);

/// Altitude bands as `(exclusive upper bound in feet, color)`.
const ALTITUDE_BANDS: [(i32, Color); 4] = [
    (10_000, Color::from_packed(0x0033_cc66)),
    (20_000, Color::from_packed(0x0033_aaff)),
    (30_000, Color::from_packed(0x0033_66ff)),
    (40_000, Color::from_packed(0x0099_33ff)),
];

/// Color for anything at or above the highest band.
const TOP_BAND_COLOR: Color = Color::from_packed(0x00ff_33cc);

/// Display color for a pilot at `alt_msl` feet moving at `groundspeed` knots.
pub fn altitude_color(alt_msl: i32, groundspeed: i32) -> Color {
    if groundspeed < GROUND_SPEED_KT {
        return GROUND_COLOR;
    }
    ALTITUDE_BANDS
        .iter()
        .find(|(ceiling, _)| alt_msl < *ceiling)
        .map_or(TOP_BAND_COLOR, |(_, color)| *color)
}

// =============================================================================
// Field conversions
// =============================================================================

/// Unix seconds, saturated into `u32`.
pub fn unix_seconds(at: DateTime<Utc>) -> u32 {
    u32::try_from(at.timestamp().max(0)).unwrap_or(u32::MAX)
}

/// Saturate an `i64` into `i16`.
fn saturate_i16(value: i64) -> i16 {
    i16::try_from(value.clamp(i64::from(i16::MIN), i64::from(i16::MAX))).unwrap_or_default()
}

/// Normalise a heading into 0 to 359 degrees.
fn normalise_heading(heading: i32) -> u16 {
    u16::try_from(heading.rem_euclid(360)).unwrap_or_default()
}

/// Vertical speed in feet per minute between two reports.
///
/// Returns `fallback` when the reports are not strictly ordered in time.
pub fn vertical_speed(
    previous_altitude: i32,
    previous_at: DateTime<Utc>,
    altitude: i32,
    at: DateTime<Utc>,
    fallback: i16,
) -> i16 {
    let elapsed = at.signed_duration_since(previous_at).num_seconds();
    if elapsed <= 0 {
        return fallback;
    }
    let climbed = i64::from(altitude).saturating_sub(i64::from(previous_altitude));
    climbed
        .saturating_mul(60)
        .checked_div(elapsed)
        .map_or(fallback, saturate_i16)
}

/// Height above ground in feet from the first radio reporting a finite value.
fn agl_feet(radios: &[Transceiver]) -> Option<f64> {
    radios
        .iter()
        .map(|radio| radio.height_agl_m)
        .find(|height| height.is_finite())
        .map(|meters| meters * FEET_PER_METER)
}

// =============================================================================
// Deriver
// =============================================================================

/// Builds a [`WorldState`] from feed documents and the previous world.
#[derive(Debug, Clone, Copy)]
pub struct Deriver {
    stale_after_secs: i64,
}

impl Deriver {
    /// Create a deriver treating pilots silent for more than
    /// `stale_after_secs` as closing.
    pub const fn new(stale_after_secs: i64) -> Self {
        Self { stale_after_secs }
    }

    /// Derive the world for `feed`.
    ///
    /// `previous` is the last committed world, used for lifecycle and
    /// vertical speed. Pilots with unusable coordinates are skipped.
    pub fn derive(
        self,
        feed: &FeedSnapshot,
        transceivers: &[TransceiverEntry],
        previous: Option<&WorldState>,
    ) -> WorldState {
        let now = feed.general.update_timestamp;
        let radios: BTreeMap<Callsign, &[Transceiver]> = transceivers
            .iter()
            .map(|entry| (Callsign::new(&entry.callsign), entry.transceivers.as_slice()))
            .collect();

        let mut world = WorldState::empty(now);
        for raw in &feed.pilots {
            let callsign = Callsign::new(&raw.callsign);
            let radios = radios.get(&callsign).copied().unwrap_or_default();
            let prior = previous.and_then(|world| world.pilots.get(&callsign));
            match self.derive_pilot(raw, callsign, radios, prior, now) {
                Some(pilot) => {
                    world.pilots.insert(pilot.callsign.clone(), pilot);
                }
                None => warn!(callsign = %raw.callsign, "pilot skipped: unusable position"),
            }
        }

        for raw in feed.controllers.iter().chain(&feed.atis) {
            let controller = derive_controller(raw);
            world.controllers.insert(controller.callsign.clone(), controller);
        }

        world.airports = derive_airports(&feed.pilots, feed.controllers.iter().chain(&feed.atis));

        debug!(
            update_timestamp = %now,
            pilots = world.pilots.len(),
            controllers = world.controllers.len(),
            airports = world.airports.len(),
            "world derived"
        );
        world
    }

    fn derive_pilot(
        self,
        raw: &FeedPilot,
        callsign: Callsign,
        radios: &[Transceiver],
        prior: Option<&Pilot>,
        now: DateTime<Utc>,
    ) -> Option<Pilot> {
        let (x, y) = to_web_mercator(raw.longitude, raw.latitude)?;
        let alt_msl = round_altitude(f64::from(raw.altitude));
        let alt_agl = agl_feet(radios).map_or(alt_msl, round_altitude);
        let vertical_speed = prior.map_or(0, |prior| {
            vertical_speed(
                prior.raw_altitude,
                prior.last_updated,
                raw.altitude,
                raw.last_updated,
                prior.track.vertical_speed,
            )
        });

        let lifecycle = if prior.is_none() {
            Lifecycle::Pending
        } else if now.signed_duration_since(raw.last_updated).num_seconds() > self.stale_after_secs {
            Lifecycle::Closing
        } else {
            Lifecycle::Steady
        };

        let track = TrackPoint {
            x,
            y,
            alt_msl,
            alt_agl,
            groundspeed: saturate_i16(i64::from(raw.groundspeed)),
            vertical_speed,
            heading: normalise_heading(raw.heading),
            color: altitude_color(alt_msl, raw.groundspeed),
            timestamp: unix_seconds(raw.last_updated),
        };

        let frequencies: BTreeSet<u64> = radios.iter().map(|radio| radio.frequency).collect();
        let plan = raw.flight_plan.as_ref();
        let details = PilotDetails {
            cid: raw.cid,
            name: raw.name.clone(),
            aircraft: plan
                .map(|plan| plan.aircraft_short.trim())
                .filter(|aircraft| !aircraft.is_empty())
                .map(str::to_owned),
            departure: plan.and_then(|plan| AirportCode::parse_icao(&plan.departure)),
            arrival: plan.and_then(|plan| AirportCode::parse_icao(&plan.arrival)),
            transponder: raw.transponder.clone(),
            frequencies: frequencies.into_iter().collect(),
        };

        Some(Pilot {
            callsign,
            track,
            details,
            lifecycle,
            raw_altitude: raw.altitude,
            last_updated: raw.last_updated,
        })
    }
}

fn derive_controller(raw: &FeedController) -> Controller {
    Controller {
        callsign: Callsign::new(&raw.callsign),
        cid: raw.cid,
        name: raw.name.clone(),
        frequency: raw.frequency.clone(),
        facility: raw.facility,
        rating: raw.rating,
        text_atis: raw.text_atis.clone().unwrap_or_default(),
        logon_time: raw.logon_time,
    }
}

/// Whether a controller position staffs the airport named by its prefix.
fn staffs_airport(raw: &FeedController) -> bool {
    AIRPORT_FACILITIES.contains(&raw.facility)
        || raw.callsign.to_ascii_uppercase().ends_with("_ATIS")
}

fn airport_entry(airports: &mut BTreeMap<AirportCode, Airport>, code: AirportCode) -> &mut Airport {
    airports
        .entry(code.clone())
        .or_insert_with(|| Airport::new(code))
}

fn derive_airports<'a>(
    pilots: &[FeedPilot],
    controllers: impl Iterator<Item = &'a FeedController>,
) -> BTreeMap<AirportCode, Airport> {
    let mut airports: BTreeMap<AirportCode, Airport> = BTreeMap::new();

    for plan in pilots.iter().filter_map(|pilot| pilot.flight_plan.as_ref()) {
        if let Some(code) = AirportCode::parse_icao(&plan.departure) {
            let airport = airport_entry(&mut airports, code);
            airport.departures = airport.departures.saturating_add(1);
        }
        if let Some(code) = AirportCode::parse_icao(&plan.arrival) {
            let airport = airport_entry(&mut airports, code);
            airport.arrivals = airport.arrivals.saturating_add(1);
        }
    }

    for raw in controllers.filter(|raw| staffs_airport(raw)) {
        let callsign = Callsign::new(&raw.callsign);
        if let Some(code) = AirportCode::parse_icao(callsign.prefix()) {
            let airport = airport_entry(&mut airports, code);
            if !airport.controllers.contains(&callsign) {
                airport.controllers.push(callsign);
            }
        }
    }

    for airport in airports.values_mut() {
        airport.controllers.sort();
    }
    airports
}
