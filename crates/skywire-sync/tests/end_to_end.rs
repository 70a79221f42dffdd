//! End-to-end tests from derived worlds to a client mirror.
//!
//! Worlds go through the real delta encoder, JSON framing, and gzip, and
//! the client rebuilds them with a [`Synchronizer`]. After every cycle the
//! mirror must hold the server's pilots, controllers, and airports. A
//! suppressed pilot keeps the observation time of its last sent record.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::io::Write as _;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use skywire_codec::{Color, DeltaEncoder, FieldMask, Lifecycle, Precision, TrackPoint, TrackRecord};
use skywire_core::derive::Deriver;
use skywire_core::diff::build_delta;
use skywire_types::{
    Callsign, FeedController, FeedFlightPlan, FeedGeneral, FeedPilot, FeedSnapshot, Pilot,
    PilotDetails, SnapshotFrame, WorldState, WsDelta,
};
use skywire_sync::{FrameOutcome, SnapshotSource, SyncError, SyncStatus, Synchronizer};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct LatestSnapshot(Mutex<Option<SnapshotFrame>>);

impl LatestSnapshot {
    fn publish(&self, world: &WorldState) {
        *self.0.lock().unwrap() = Some(world.snapshot_frame());
    }
}

impl SnapshotSource for &LatestSnapshot {
    async fn fetch_snapshot(&self) -> Result<SnapshotFrame, SyncError> {
        self.0.lock().unwrap().clone().ok_or_else(|| SyncError::Status {
            url: "memory://snapshot".to_owned(),
            status: 503,
        })
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn frame(delta: &WsDelta) -> Vec<u8> {
    gzip(&serde_json::to_vec(delta).unwrap())
}

fn pilot(callsign: &str, lat: f64, lon: f64, squawk: &str, route: (&str, &str), ts: i64) -> FeedPilot {
    FeedPilot {
        cid: 1_000_000,
        name: format!("{callsign} crew"),
        callsign: callsign.to_owned(),
        latitude: lat,
        longitude: lon,
        altitude: 35_000,
        groundspeed: 450,
        transponder: squawk.to_owned(),
        heading: 270,
        flight_plan: Some(FeedFlightPlan {
            flight_rules: "I".to_owned(),
            aircraft_short: "B77W".to_owned(),
            departure: route.0.to_owned(),
            arrival: route.1.to_owned(),
        }),
        logon_time: at(0),
        last_updated: at(ts),
    }
}

fn tower(ts: i64) -> FeedController {
    FeedController {
        cid: 2_000_000,
        name: "Tower".to_owned(),
        callsign: "KJFK_TWR".to_owned(),
        frequency: "119.100".to_owned(),
        facility: 4,
        rating: 5,
        text_atis: None,
        logon_time: at(0),
        last_updated: at(ts),
    }
}

fn feed(ts: i64, pilots: Vec<FeedPilot>, controllers: Vec<FeedController>) -> FeedSnapshot {
    FeedSnapshot {
        general: FeedGeneral {
            version: 3,
            update_timestamp: at(ts),
            connected_clients: 0,
            unique_users: 0,
        },
        pilots,
        controllers,
        atis: Vec::new(),
    }
}

/// Server side of one cycle: derive, diff, commit, frame.
fn serve_cycle(
    encoder: &mut DeltaEncoder<Callsign>,
    previous: Option<&WorldState>,
    feed: &FeedSnapshot,
) -> (WorldState, Vec<u8>) {
    let world = Deriver::new(60).derive(feed, &[], previous);
    let delta = build_delta(previous, &world, encoder, Precision::Full).unwrap();
    encoder.finish_cycle();
    (world, frame(&delta))
}

/// A track with its observation time cleared.
const fn untimed(track: TrackPoint) -> TrackPoint {
    TrackPoint { timestamp: 0, ..track }
}

fn assert_mirrors(sync: &Synchronizer<&LatestSnapshot>, world: &WorldState) {
    let mirror = sync.mirror();
    assert_eq!(mirror.timestamp(), Some(world.update_timestamp));
    assert_eq!(mirror.pilots().len(), world.pilots.len());
    for (callsign, pilot) in &world.pilots {
        let mirrored = mirror.pilot(callsign).unwrap();
        assert_eq!(untimed(mirrored.track), untimed(pilot.track), "{callsign}");
        assert!(mirrored.track.timestamp <= pilot.track.timestamp, "{callsign}");
        assert_eq!(mirrored.details, pilot.details, "{callsign}");
    }
    assert_eq!(mirror.controllers(), &world.controllers);
    assert_eq!(mirror.airports(), &world.airports);
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn late_joiner_converges_on_server_state() {
    let snapshots = LatestSnapshot::default();
    let mut encoder = DeltaEncoder::default();
    let mut sync = Synchronizer::new(&snapshots);

    // Cycle 1: the client is connected but has no snapshot yet.
    let feed1 = feed(
        100,
        vec![
            pilot("BAW1", 51.47, -0.45, "2201", ("EGLL", "KJFK"), 100),
            pilot("DAL2", 40.64, -73.78, "3344", ("KJFK", "KATL"), 100),
        ],
        vec![tower(100)],
    );
    let (world1, frame1) = serve_cycle(&mut encoder, None, &feed1);
    snapshots.publish(&world1);
    assert_eq!(sync.on_frame(&frame1).unwrap(), FrameOutcome::Buffered);

    // Cycle 2: BAW1 moves, DAL2 holds still, UAL3 appears.
    let feed2 = feed(
        115,
        vec![
            pilot("BAW1", 51.48, -0.60, "2201", ("EGLL", "KJFK"), 115),
            pilot("DAL2", 40.64, -73.78, "3344", ("KJFK", "KATL"), 115),
            pilot("UAL3", 41.97, -87.90, "1200", ("KORD", "KJFK"), 115),
        ],
        vec![tower(115)],
    );
    let (world2, frame2) = serve_cycle(&mut encoder, Some(&world1), &feed2);
    assert_eq!(sync.on_frame(&frame2).unwrap(), FrameOutcome::Buffered);
    snapshots.publish(&world2);

    sync.resync().await.unwrap();
    assert_eq!(sync.status(), SyncStatus::Live);
    assert_mirrors(&sync, &world2);

    // Cycle 3: BAW1 moves again, DAL2 and the tower leave, UAL3 squawks.
    let feed3 = feed(
        130,
        vec![
            pilot("BAW1", 51.49, -0.75, "2201", ("EGLL", "KJFK"), 130),
            pilot("UAL3", 41.97, -87.90, "7600", ("KORD", "KJFK"), 130),
        ],
        Vec::new(),
    );
    let (world3, frame3) = serve_cycle(&mut encoder, Some(&world2), &feed3);
    assert_eq!(sync.on_frame(&frame3).unwrap(), FrameOutcome::Applied);
    assert_mirrors(&sync, &world3);

    // Cycle 4: nothing moves.
    let feed4 = feed(
        145,
        vec![
            pilot("BAW1", 51.49, -0.75, "2201", ("EGLL", "KJFK"), 145),
            pilot("UAL3", 41.97, -87.90, "7600", ("KORD", "KJFK"), 145),
        ],
        Vec::new(),
    );
    let (world4, frame4) = serve_cycle(&mut encoder, Some(&world3), &feed4);
    assert_eq!(sync.on_frame(&frame4).unwrap(), FrameOutcome::Applied);
    assert_mirrors(&sync, &world4);

    // Steady and unchanged, so nothing new was sent for BAW1.
    let baw = Callsign::new("BAW1");
    assert_eq!(
        sync.mirror().pilot(&baw).map(|p| p.track),
        encoder.last_sent(&baw).copied()
    );
    assert_eq!(encoder.last_sent(&baw).map(|t| t.timestamp), Some(130));
}

#[tokio::test]
async fn groundspeed_change_travels_as_single_field_delta() {
    let snapshots = LatestSnapshot::default();
    let mut encoder = DeltaEncoder::default();
    let callsign = Callsign::new("AAL100");

    let track = TrackPoint {
        x: 100,
        y: 200,
        alt_msl: 1000,
        alt_agl: 500,
        groundspeed: 250,
        vertical_speed: 0,
        heading: 90,
        color: Color::new(0xff, 0x00, 0x00),
        timestamp: 1000,
    };
    let mut first = WorldState::empty(at(1000));
    first.pilots.insert(
        callsign.clone(),
        Pilot {
            callsign: callsign.clone(),
            track,
            details: PilotDetails::default(),
            lifecycle: Lifecycle::Pending,
            raw_altitude: 1000,
            last_updated: at(1000),
        },
    );
    build_delta(None, &first, &mut encoder, Precision::Full).unwrap();
    encoder.finish_cycle();
    snapshots.publish(&first);

    let mut sync = Synchronizer::new(&snapshots);
    sync.resync().await.unwrap();

    let mut second = first.clone();
    second.update_timestamp = at(1005);
    if let Some(pilot) = second.pilots.get_mut(&callsign) {
        pilot.track.groundspeed = 260;
        pilot.track.timestamp = 1005;
        pilot.lifecycle = Lifecycle::Steady;
    }
    let delta = build_delta(Some(&first), &second, &mut encoder, Precision::Full).unwrap();
    encoder.finish_cycle();

    let update = delta.pilots.updated.first().unwrap();
    let Some(TrackRecord::Delta(track_delta)) = &update.track else {
        panic!("expected a delta record, got {:?}", update.track);
    };
    assert_eq!(track_delta.mask, FieldMask::GROUNDSPEED);
    assert_eq!(track_delta.mask.bits(), 0b000_1000);
    assert_eq!(track_delta.values, vec![260]);
    assert_eq!(track_delta.timestamp, 1005);

    assert_eq!(sync.on_frame(&frame(&delta)).unwrap(), FrameOutcome::Applied);
    let mirrored = sync.mirror().pilot(&callsign).unwrap();
    assert_eq!(mirrored.track.groundspeed, 260);
    assert_eq!(mirrored.track.timestamp, 1005);
    assert_eq!(mirrored.track.x, 100);
}
