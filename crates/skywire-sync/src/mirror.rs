//! Client-side copy of the world.
//!
//! A [`Mirror`] is replaced wholesale by a snapshot and then advanced by
//! delta frames. Pilot changes are staged on a working copy that replaces
//! the mirror's pilots only once the whole delta applies, so a delta that
//! does not fit leaves the mirror exactly as it was.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use skywire_codec::{CodecError, TrackPoint};
use skywire_types::{
    Airport, AirportCode, Callsign, CollectionDiff, Controller, PilotDetails, PilotEntry,
    PilotUpdate, SnapshotFrame, WsDelta,
};

use crate::error::SyncError;

/// A mirrored pilot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPilot {
    /// Latest resolved track.
    pub track: TrackPoint,
    /// Latest details.
    pub details: PilotDetails,
}

/// What [`Mirror::apply_delta`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The delta was applied.
    Applied,
    /// The delta was not newer than the mirror and was ignored.
    Stale,
}

/// The mirrored world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mirror {
    timestamp: Option<DateTime<Utc>>,
    pilots: BTreeMap<Callsign, MirrorPilot>,
    controllers: BTreeMap<Callsign, Controller>,
    airports: BTreeMap<AirportCode, Airport>,
}

impl Mirror {
    /// An empty mirror with no timestamp.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed timestamp of the newest frame applied.
    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// A mirrored pilot.
    pub fn pilot(&self, callsign: &Callsign) -> Option<&MirrorPilot> {
        self.pilots.get(callsign)
    }

    /// All mirrored pilots.
    pub const fn pilots(&self) -> &BTreeMap<Callsign, MirrorPilot> {
        &self.pilots
    }

    /// All mirrored controllers.
    pub const fn controllers(&self) -> &BTreeMap<Callsign, Controller> {
        &self.controllers
    }

    /// All mirrored airports.
    pub const fn airports(&self) -> &BTreeMap<AirportCode, Airport> {
        &self.airports
    }

    /// Replace the whole mirror with `frame`.
    pub fn apply_full(&mut self, frame: SnapshotFrame) {
        self.timestamp = Some(frame.timestamp);
        self.pilots = frame
            .pilots
            .into_iter()
            .map(|entry| {
                (
                    entry.callsign,
                    MirrorPilot {
                        track: entry.track,
                        details: entry.details,
                    },
                )
            })
            .collect();
        self.controllers = frame
            .controllers
            .into_iter()
            .map(|controller| (controller.callsign.clone(), controller))
            .collect();
        self.airports = frame
            .airports
            .into_iter()
            .map(|airport| (airport.icao.clone(), airport))
            .collect();
    }

    /// Apply one delta: added, then updated, then removed.
    ///
    /// Updates resolve in order against the pilots as they stand after the
    /// adds and any earlier updates. A delta no newer than the mirror is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingBaseline`] if an update names a pilot
    /// the mirror does not hold, or [`SyncError::Codec`] if a track delta
    /// does not apply. The mirror is unchanged in both cases.
    pub fn apply_delta(&mut self, delta: &WsDelta) -> Result<ApplyOutcome, SyncError> {
        if self.timestamp.is_some_and(|current| delta.timestamp <= current) {
            return Ok(ApplyOutcome::Stale);
        }

        let mut pilots = self.pilots.clone();
        for entry in &delta.pilots.added {
            pilots.insert(
                entry.callsign.clone(),
                MirrorPilot {
                    track: entry.track,
                    details: entry.details.clone(),
                },
            );
        }
        for update in &delta.pilots.updated {
            apply_pilot_update(&mut pilots, update)?;
        }
        for callsign in &delta.pilots.removed {
            pilots.remove(callsign);
        }

        self.pilots = pilots;
        apply_keyed(&mut self.controllers, &delta.controllers, |c| c.callsign.clone());
        apply_keyed(&mut self.airports, &delta.airports, |a| a.icao.clone());

        self.timestamp = Some(delta.timestamp);
        Ok(ApplyOutcome::Applied)
    }

    /// The mirror as a snapshot frame, or `None` before any frame applied.
    pub fn to_snapshot(&self) -> Option<SnapshotFrame> {
        let timestamp = self.timestamp?;
        Some(SnapshotFrame {
            timestamp,
            pilots: self
                .pilots
                .iter()
                .map(|(callsign, pilot)| PilotEntry {
                    callsign: callsign.clone(),
                    track: pilot.track,
                    details: pilot.details.clone(),
                })
                .collect(),
            controllers: self.controllers.values().cloned().collect(),
            airports: self.airports.values().cloned().collect(),
        })
    }
}

/// Resolve `update` against the pilot it names and store the result.
fn apply_pilot_update(
    pilots: &mut BTreeMap<Callsign, MirrorPilot>,
    update: &PilotUpdate,
) -> Result<(), SyncError> {
    let missing = || SyncError::MissingBaseline {
        callsign: update.callsign.clone(),
    };
    let current = pilots.get_mut(&update.callsign).ok_or_else(missing)?;
    if let Some(record) = &update.track {
        current.track = record
            .resolve(Some(&current.track))
            .map_err(|e| match e {
                CodecError::DeltaWithoutBase => missing(),
                other => SyncError::Codec(other),
            })?;
    }
    if let Some(details) = &update.details {
        current.details = details.clone();
    }
    Ok(())
}

/// Apply a by-value collection diff to `map`.
fn apply_keyed<K, V>(
    map: &mut BTreeMap<K, V>,
    diff: &CollectionDiff<K, V, V>,
    key: impl Fn(&V) -> K,
) where
    K: Ord,
    V: Clone,
{
    for value in diff.added.iter().chain(&diff.updated) {
        map.insert(key(value), value.clone());
    }
    for removed in &diff.removed {
        map.remove(removed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use skywire_codec::{Color, FieldMask, TrackDelta, TrackRecord};

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn track() -> TrackPoint {
        TrackPoint {
            x: 100,
            y: 200,
            alt_msl: 1000,
            alt_agl: 500,
            groundspeed: 250,
            vertical_speed: 0,
            heading: 90,
            color: Color::new(0xff, 0, 0),
            timestamp: 1000,
        }
    }

    fn entry(callsign: &str) -> PilotEntry {
        PilotEntry {
            callsign: Callsign::new(callsign),
            track: track(),
            details: PilotDetails::default(),
        }
    }

    fn groundspeed_update(callsign: &str, groundspeed: i32, timestamp: u32) -> PilotUpdate {
        PilotUpdate {
            callsign: Callsign::new(callsign),
            track: Some(TrackRecord::Delta(TrackDelta {
                mask: FieldMask::GROUNDSPEED,
                values: vec![groundspeed],
                timestamp,
            })),
            details: None,
        }
    }

    fn seeded() -> Mirror {
        let mut mirror = Mirror::new();
        mirror.apply_full(SnapshotFrame {
            timestamp: at(1000),
            pilots: vec![entry("AAL1"), entry("DAL2")],
            controllers: Vec::new(),
            airports: vec![Airport::new(AirportCode::new("KJFK"))],
        });
        mirror
    }

    #[test]
    fn full_frame_replaces_contents() {
        let mut mirror = seeded();
        mirror.apply_full(SnapshotFrame {
            timestamp: at(2000),
            pilots: vec![entry("UAL3")],
            controllers: Vec::new(),
            airports: Vec::new(),
        });
        assert_eq!(mirror.timestamp(), Some(at(2000)));
        assert_eq!(mirror.pilots().len(), 1);
        assert!(mirror.pilot(&Callsign::new("AAL1")).is_none());
        assert!(mirror.airports().is_empty());
    }

    #[test]
    fn delta_applies_added_updated_removed() {
        let mut mirror = seeded();
        let mut delta = WsDelta::empty(at(1005));
        delta.pilots.added.push(entry("UAL3"));
        delta.pilots.updated.push(groundspeed_update("AAL1", 260, 1005));
        delta.pilots.removed.push(Callsign::new("DAL2"));
        delta.airports.removed.push(AirportCode::new("KJFK"));

        assert_eq!(mirror.apply_delta(&delta).unwrap(), ApplyOutcome::Applied);

        let aal = mirror.pilot(&Callsign::new("AAL1")).unwrap();
        assert_eq!(aal.track.groundspeed, 260);
        assert_eq!(aal.track.timestamp, 1005);
        assert_eq!(aal.track.heading, 90);
        assert!(mirror.pilot(&Callsign::new("UAL3")).is_some());
        assert!(mirror.pilot(&Callsign::new("DAL2")).is_none());
        assert!(mirror.airports().is_empty());
        assert_eq!(mirror.timestamp(), Some(at(1005)));
    }

    #[test]
    fn update_without_baseline_leaves_mirror_untouched() {
        let mut mirror = seeded();
        let before = mirror.clone();

        let mut delta = WsDelta::empty(at(1005));
        delta.pilots.added.push(entry("UAL3"));
        delta.pilots.updated.push(groundspeed_update("AAL1", 260, 1005));
        delta.pilots.updated.push(groundspeed_update("SWA9", 300, 1005));

        let err = mirror.apply_delta(&delta).unwrap_err();
        assert!(
            matches!(err, SyncError::MissingBaseline { ref callsign } if *callsign == Callsign::new("SWA9"))
        );
        assert_eq!(mirror, before);
    }

    #[test]
    fn update_sees_pilot_added_in_same_delta() {
        let mut mirror = seeded();
        let mut delta = WsDelta::empty(at(1020));
        delta.pilots.added.push(entry("UAL3"));
        delta.pilots.updated.push(groundspeed_update("UAL3", 300, 1020));

        assert_eq!(mirror.apply_delta(&delta).unwrap(), ApplyOutcome::Applied);
        let ual = mirror.pilot(&Callsign::new("UAL3")).unwrap();
        assert_eq!(ual.track.groundspeed, 300);
        assert_eq!(ual.track.timestamp, 1020);
    }

    #[test]
    fn readded_pilot_is_the_base_for_its_update() {
        let mut mirror = seeded();
        let mut readded = entry("AAL1");
        readded.track.heading = 180;
        let mut delta = WsDelta::empty(at(1020));
        delta.pilots.added.push(readded);
        delta.pilots.updated.push(groundspeed_update("AAL1", 300, 1020));

        mirror.apply_delta(&delta).unwrap();
        let aal = mirror.pilot(&Callsign::new("AAL1")).unwrap();
        assert_eq!(aal.track.heading, 180);
        assert_eq!(aal.track.groundspeed, 300);
    }

    #[test]
    fn repeated_updates_apply_in_order() {
        let mut mirror = seeded();
        let mut delta = WsDelta::empty(at(1020));
        delta.pilots.updated.push(groundspeed_update("AAL1", 260, 1010));
        delta.pilots.updated.push(PilotUpdate {
            callsign: Callsign::new("AAL1"),
            track: Some(TrackRecord::Delta(TrackDelta {
                mask: FieldMask::HEADING,
                values: vec![95],
                timestamp: 1020,
            })),
            details: None,
        });

        mirror.apply_delta(&delta).unwrap();
        let aal = mirror.pilot(&Callsign::new("AAL1")).unwrap();
        assert_eq!(aal.track.groundspeed, 260);
        assert_eq!(aal.track.heading, 95);
        assert_eq!(aal.track.timestamp, 1020);
    }

    #[test]
    fn stale_delta_is_ignored() {
        let mut mirror = seeded();
        let before = mirror.clone();
        let mut delta = WsDelta::empty(at(1000));
        delta.pilots.removed.push(Callsign::new("AAL1"));

        assert_eq!(mirror.apply_delta(&delta).unwrap(), ApplyOutcome::Stale);
        assert_eq!(mirror, before);
    }

    #[test]
    fn detail_only_update_keeps_track() {
        let mut mirror = seeded();
        let mut delta = WsDelta::empty(at(1015));
        delta.pilots.updated.push(PilotUpdate {
            callsign: Callsign::new("AAL1"),
            track: None,
            details: Some(PilotDetails {
                transponder: "7700".to_owned(),
                ..PilotDetails::default()
            }),
        });

        mirror.apply_delta(&delta).unwrap();
        let aal = mirror.pilot(&Callsign::new("AAL1")).unwrap();
        assert_eq!(aal.track, track());
        assert_eq!(aal.details.transponder, "7700");
    }

    #[test]
    fn snapshot_view_round_trips() {
        let mirror = seeded();
        let frame = mirror.to_snapshot().unwrap();
        let mut copy = Mirror::new();
        copy.apply_full(frame);
        assert_eq!(copy, mirror);
        assert!(Mirror::new().to_snapshot().is_none());
    }
}
