//! Integration tests for the ingestion cycle.
//!
//! The loop runs against a scripted feed and a publisher that records
//! every frame, so commit and abort behavior can be checked without a
//! network or a broker.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use skywire_codec::TrackRecord;
use skywire_core::{
    Channel, CycleOutcome, FeedError, FeedSource, IngestLoop, IngestSettings, PublishError,
    Publisher,
};
use skywire_types::{
    Callsign, FeedGeneral, FeedPilot, FeedSnapshot, SnapshotFrame, TransceiverEntry, WsDelta,
};
use tokio::sync::{Notify, oneshot};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

#[derive(Default)]
struct ScriptedFeed {
    snapshot: Mutex<Option<FeedSnapshot>>,
    fail_transceivers: AtomicBool,
    gate: Option<Arc<Gate>>,
}

impl ScriptedFeed {
    fn serve(&self, snapshot: FeedSnapshot) {
        *self.snapshot.lock().unwrap() = Some(snapshot);
    }
}

impl FeedSource for ScriptedFeed {
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot, FeedError> {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let snapshot = self.snapshot.lock().unwrap().clone();
        snapshot.ok_or_else(|| FeedError::Status {
            url: "scripted://feed".to_owned(),
            status: 503,
        })
    }

    async fn fetch_transceivers(&self) -> Result<Vec<TransceiverEntry>, FeedError> {
        if self.fail_transceivers.load(Ordering::Acquire) {
            return Err(FeedError::Status {
                url: "scripted://transceivers".to_owned(),
                status: 500,
            });
        }
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct RecordingPublisher {
    frames: Mutex<Vec<(Channel, Bytes)>>,
    fail_on: Mutex<Option<Channel>>,
}

impl RecordingPublisher {
    fn frames(&self) -> Vec<(Channel, Bytes)> {
        self.frames.lock().unwrap().clone()
    }

    fn fail_on(&self, channel: Option<Channel>) {
        *self.fail_on.lock().unwrap() = channel;
    }
}

impl Publisher for RecordingPublisher {
    async fn publish(&self, channel: Channel, payload: Bytes) -> Result<(), PublishError> {
        let failing = *self.fail_on.lock().unwrap();
        if failing == Some(channel) {
            return Err(PublishError::Broker {
                channel,
                source: "broker unavailable".into(),
            });
        }
        self.frames.lock().unwrap().push((channel, payload));
        Ok(())
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn pilot(callsign: &str, groundspeed: i32, last_updated: i64) -> FeedPilot {
    FeedPilot {
        cid: 1_000_001,
        name: "Test Pilot".to_owned(),
        callsign: callsign.to_owned(),
        latitude: 51.47,
        longitude: -0.4543,
        altitude: 12_000,
        groundspeed,
        transponder: "7000".to_owned(),
        heading: 270,
        flight_plan: None,
        logon_time: at(1_700_000_000),
        last_updated: at(last_updated),
    }
}

fn feed(update: i64, pilots: Vec<FeedPilot>) -> FeedSnapshot {
    FeedSnapshot {
        general: FeedGeneral {
            version: 3,
            update_timestamp: at(update),
            connected_clients: 0,
            unique_users: 0,
        },
        pilots,
        controllers: Vec::new(),
        atis: Vec::new(),
    }
}

fn ingest_loop(feed: ScriptedFeed) -> IngestLoop<ScriptedFeed, RecordingPublisher> {
    IngestLoop::new(feed, RecordingPublisher::default(), IngestSettings::default())
}

fn decode_delta(payload: &Bytes) -> WsDelta {
    serde_json::from_slice(payload).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn first_cycle_publishes_snapshot_then_delta() {
    let source = ScriptedFeed::default();
    source.serve(feed(
        1_700_000_100,
        vec![pilot("BAW1", 250, 1_700_000_100), pilot("BAW2", 300, 1_700_000_100)],
    ));
    let ingest = ingest_loop(source);

    let outcome = ingest.run_cycle().await;
    let CycleOutcome::Published(summary) = outcome else {
        panic!("expected a published cycle, got {outcome:?}");
    };
    assert_eq!(summary.pilots, 2);

    let frames = ingest.publisher().frames();
    let channels: Vec<Channel> = frames.iter().map(|(channel, _)| *channel).collect();
    assert_eq!(channels, vec![Channel::Snapshot, Channel::Delta]);

    let delta = decode_delta(&frames.get(1).unwrap().1);
    assert_eq!(delta.pilots.added.len(), 2);
    let snapshot: SnapshotFrame = serde_json::from_slice(&frames.first().unwrap().1).unwrap();
    assert_eq!(snapshot.pilots.len(), 2);
    assert_eq!(snapshot.timestamp, at(1_700_000_100));

    assert_eq!(ingest.last_accepted().await, Some(at(1_700_000_100)));
    assert_eq!(ingest.cached_tracks().await, 2);
}

#[tokio::test]
async fn unchanged_timestamp_publishes_nothing() {
    let source = ScriptedFeed::default();
    source.serve(feed(1_700_000_100, vec![pilot("BAW1", 250, 1_700_000_100)]));
    let ingest = ingest_loop(source);

    assert!(matches!(ingest.run_cycle().await, CycleOutcome::Published(_)));
    let world = ingest.world().await;

    assert_eq!(ingest.run_cycle().await, CycleOutcome::Unchanged);
    assert_eq!(ingest.publisher().frames().len(), 2);
    assert_eq!(ingest.world().await, world);

    // An older feed is treated the same way.
    ingest
        .feed()
        .serve(feed(1_700_000_085, vec![pilot("BAW1", 999, 1_700_000_085)]));
    assert_eq!(ingest.run_cycle().await, CycleOutcome::Unchanged);
    assert_eq!(ingest.publisher().frames().len(), 2);
}

#[tokio::test]
async fn publish_failure_leaves_state_untouched() {
    let source = ScriptedFeed::default();
    source.serve(feed(1_700_000_100, vec![pilot("BAW1", 250, 1_700_000_100)]));
    let ingest = ingest_loop(source);
    assert!(matches!(ingest.run_cycle().await, CycleOutcome::Published(_)));
    let committed = ingest.world().await;

    ingest
        .feed()
        .serve(feed(1_700_000_115, vec![pilot("BAW1", 260, 1_700_000_115)]));
    ingest.publisher().fail_on(Some(Channel::Delta));
    assert_eq!(ingest.run_cycle().await, CycleOutcome::Failed);
    assert_eq!(ingest.last_accepted().await, Some(at(1_700_000_100)));
    assert_eq!(ingest.world().await, committed);
    // The snapshot of the failed cycle went out; its delta did not.
    assert_eq!(ingest.publisher().frames().len(), 3);

    // The retry diffs against the committed cache, not the aborted attempt.
    ingest.publisher().fail_on(None);
    assert!(matches!(ingest.run_cycle().await, CycleOutcome::Published(_)));
    let frames = ingest.publisher().frames();
    let (channel, payload) = frames.last().unwrap();
    assert_eq!(*channel, Channel::Delta);
    let delta = decode_delta(payload);
    let update = delta.pilots.updated.first().unwrap();
    assert_eq!(update.callsign, Callsign::new("BAW1"));
    assert!(matches!(&update.track, Some(TrackRecord::Delta(d)) if d.values == vec![260]));
    assert_eq!(ingest.last_accepted().await, Some(at(1_700_000_115)));
}

#[tokio::test]
async fn transceiver_failure_fails_the_cycle() {
    let source = ScriptedFeed::default();
    source.serve(feed(1_700_000_100, vec![pilot("BAW1", 250, 1_700_000_100)]));
    source.fail_transceivers.store(true, Ordering::Release);
    let ingest = ingest_loop(source);

    assert_eq!(ingest.run_cycle().await, CycleOutcome::Failed);
    assert!(ingest.publisher().frames().is_empty());
    assert_eq!(ingest.last_accepted().await, None);
    assert_eq!(ingest.cached_tracks().await, 0);
    assert!(!ingest.is_fetching());
}

#[tokio::test]
async fn overlapping_tick_is_dropped() {
    let gate = Arc::new(Gate::default());
    let source = ScriptedFeed {
        gate: Some(Arc::clone(&gate)),
        ..ScriptedFeed::default()
    };
    source.serve(feed(1_700_000_100, vec![pilot("BAW1", 250, 1_700_000_100)]));
    let ingest = Arc::new(ingest_loop(source));

    let first = tokio::spawn({
        let ingest = Arc::clone(&ingest);
        async move { ingest.run_cycle().await }
    });
    gate.entered.notified().await;

    assert!(ingest.is_fetching());
    assert_eq!(ingest.run_cycle().await, CycleOutcome::Busy);

    gate.release.notify_one();
    assert!(matches!(first.await.unwrap(), CycleOutcome::Published(_)));
    assert!(!ingest.is_fetching());
    assert_eq!(ingest.publisher().frames().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn run_ticks_until_shutdown() {
    let source = ScriptedFeed::default();
    source.serve(feed(1_700_000_100, vec![pilot("BAW1", 250, 1_700_000_100)]));
    let ingest = Arc::new(ingest_loop(source));

    let (stop, stopped) = oneshot::channel::<()>();
    let runner = tokio::spawn(Arc::clone(&ingest).run(async move {
        let _ = stopped.await;
    }));

    tokio::time::sleep(Duration::from_secs(1)).await;
    stop.send(()).unwrap();
    runner.await.unwrap();

    assert_eq!(ingest.last_accepted().await, Some(at(1_700_000_100)));
    assert_eq!(ingest.publisher().frames().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_cycle_in_flight() {
    let gate = Arc::new(Gate::default());
    let source = ScriptedFeed {
        gate: Some(Arc::clone(&gate)),
        ..ScriptedFeed::default()
    };
    source.serve(feed(1_700_000_100, vec![pilot("BAW1", 250, 1_700_000_100)]));
    let ingest = Arc::new(ingest_loop(source));

    let (stop, stopped) = oneshot::channel::<()>();
    let mut runner = tokio::spawn(Arc::clone(&ingest).run(async move {
        let _ = stopped.await;
    }));
    gate.entered.notified().await;
    stop.send(()).unwrap();

    let early = tokio::time::timeout(Duration::from_secs(5), &mut runner).await;
    assert!(early.is_err(), "run returned while a cycle was in flight");
    assert!(ingest.publisher().frames().is_empty());

    gate.release.notify_one();
    runner.await.unwrap();
    assert_eq!(ingest.publisher().frames().len(), 2);
    assert_eq!(ingest.last_accepted().await, Some(at(1_700_000_100)));
}
