//! The ingestion loop.
//!
//! Each cycle fetches the feed, skips it if the feed timestamp has not
//! advanced, derives the world, diffs it against the last committed world,
//! and publishes a snapshot frame followed by a delta frame. State is only
//! committed after both publishes succeed; any failure leaves the last
//! accepted timestamp, the world, and the encoder cache exactly as they were.
//!
//! The snapshot goes first so a client that joins mid-cycle never fetches
//! a snapshot older than the deltas it is about to receive.
//!
//! # Concurrency
//!
//! Cycles are guarded by an atomic `fetching` flag. A tick that arrives
//! while a cycle is in flight returns [`CycleOutcome::Busy`] at once and is
//! dropped, never queued.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use skywire_codec::{CodecError, DeltaEncoder, Precision, SuppressionFilter};
use skywire_types::{Callsign, WorldState};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SkywireConfig;
use crate::derive::Deriver;
use crate::diff::build_delta;
use crate::feed::{FeedError, FeedSource};
use crate::publish::{Channel, PublishError, Publisher};

/// Errors that fail a single ingestion cycle.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Fetching a feed document failed.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// A track could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A frame could not be serialized.
    #[error("frame serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Publishing a frame failed.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Tunables for the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Time between ticks.
    pub poll_interval: Duration,
    /// Fields participating in change detection.
    pub precision: Precision,
    /// Whether unchanged steady pilots are suppressed.
    pub suppress_unchanged: bool,
    /// Seconds of silence after which a pilot is closing.
    pub stale_after_secs: i64,
}

impl IngestSettings {
    /// Settings taken from the loaded configuration.
    pub const fn from_config(config: &SkywireConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.feed.poll_interval_secs),
            precision: config.encoding.precision,
            suppress_unchanged: config.encoding.suppress_unchanged,
            stale_after_secs: config.feed.stale_after_secs,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self::from_config(&SkywireConfig::default())
    }
}

/// Summary of a published cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// Feed timestamp that was accepted.
    pub timestamp: DateTime<Utc>,
    /// Pilots in the new world.
    pub pilots: usize,
    /// Controllers in the new world.
    pub controllers: usize,
    /// Airports in the new world.
    pub airports: usize,
    /// Entries across all partitions of the delta.
    pub changes: usize,
    /// Size of the delta payload in bytes.
    pub delta_bytes: usize,
    /// Size of the snapshot payload in bytes.
    pub snapshot_bytes: usize,
}

/// What a call to [`IngestLoop::run_cycle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was in flight; this tick was dropped.
    Busy,
    /// The feed timestamp had not advanced; nothing was published.
    Unchanged,
    /// Frames were published and the new state committed.
    Published(CycleSummary),
    /// The cycle failed and no state changed.
    Failed,
}

/// State carried between cycles.
#[derive(Debug)]
pub struct IngestState {
    /// Feed timestamp of the last committed cycle.
    pub last_accepted: Option<DateTime<Utc>>,
    /// Last committed world.
    pub world: Option<WorldState>,
    /// Track encoder holding the last-sent cache.
    pub encoder: DeltaEncoder<Callsign>,
}

impl IngestState {
    fn new(filter: SuppressionFilter) -> Self {
        Self {
            last_accepted: None,
            world: None,
            encoder: DeltaEncoder::new(filter),
        }
    }
}

/// Resets the fetching flag when a cycle ends, including by cancellation.
struct FetchGuard<'a>(&'a AtomicBool);

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The polling ingestion loop.
#[derive(Debug)]
pub struct IngestLoop<F, P> {
    feed: F,
    publisher: P,
    settings: IngestSettings,
    deriver: Deriver,
    fetching: AtomicBool,
    state: Mutex<IngestState>,
}

impl<F, P> IngestLoop<F, P>
where
    F: FeedSource + Send + Sync,
    P: Publisher + Send + Sync,
{
    /// Create a loop with empty state.
    pub fn new(feed: F, publisher: P, settings: IngestSettings) -> Self {
        Self {
            feed,
            publisher,
            settings,
            deriver: Deriver::new(settings.stale_after_secs),
            fetching: AtomicBool::new(false),
            state: Mutex::new(IngestState::new(SuppressionFilter::new(
                settings.suppress_unchanged,
            ))),
        }
    }

    /// The feed source.
    pub const fn feed(&self) -> &F {
        &self.feed
    }

    /// The publisher.
    pub const fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Whether a cycle is currently in flight.
    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::Acquire)
    }

    /// Feed timestamp of the last committed cycle.
    pub async fn last_accepted(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last_accepted
    }

    /// A copy of the last committed world.
    pub async fn world(&self) -> Option<WorldState> {
        self.state.lock().await.world.clone()
    }

    /// Number of pilots in the encoder's last-sent cache.
    pub async fn cached_tracks(&self) -> usize {
        self.state.lock().await.encoder.len()
    }

    /// Run one cycle.
    ///
    /// Never returns an error: failures are logged and reported as
    /// [`CycleOutcome::Failed`], and the next tick retries.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("ingestion cycle already in flight, tick dropped");
            return CycleOutcome::Busy;
        }
        let _guard = FetchGuard(&self.fetching);

        match self.try_cycle().await {
            Ok(Some(summary)) => {
                info!(
                    timestamp = %summary.timestamp,
                    pilots = summary.pilots,
                    controllers = summary.controllers,
                    airports = summary.airports,
                    changes = summary.changes,
                    delta_bytes = summary.delta_bytes,
                    snapshot_bytes = summary.snapshot_bytes,
                    "ingestion cycle published"
                );
                CycleOutcome::Published(summary)
            }
            Ok(None) => CycleOutcome::Unchanged,
            Err(err) => {
                warn!(error = %err, "ingestion cycle failed");
                CycleOutcome::Failed
            }
        }
    }

    async fn try_cycle(&self) -> Result<Option<CycleSummary>, IngestError> {
        let mut state = self.state.lock().await;

        let feed = self.feed.fetch_snapshot().await?;
        let timestamp = feed.general.update_timestamp;
        if state.last_accepted.is_some_and(|last| timestamp <= last) {
            debug!(%timestamp, "feed timestamp unchanged, cycle skipped");
            return Ok(None);
        }

        let transceivers = self.feed.fetch_transceivers().await?;
        let world = self
            .deriver
            .derive(&feed, &transceivers, state.world.as_ref());

        let IngestState {
            world: previous,
            encoder,
            ..
        } = &mut *state;
        match self.publish_cycle(previous.as_ref(), &world, encoder).await {
            Ok(summary) => {
                encoder.finish_cycle();
                state.world = Some(world);
                state.last_accepted = Some(timestamp);
                Ok(Some(summary))
            }
            Err(err) => {
                encoder.abort_cycle();
                Err(err)
            }
        }
    }

    async fn publish_cycle(
        &self,
        previous: Option<&WorldState>,
        world: &WorldState,
        encoder: &mut DeltaEncoder<Callsign>,
    ) -> Result<CycleSummary, IngestError> {
        let delta = build_delta(previous, world, encoder, self.settings.precision)?;
        let delta_payload = Bytes::from(serde_json::to_vec(&delta)?);
        let snapshot_payload = Bytes::from(serde_json::to_vec(&world.snapshot_frame())?);

        let summary = CycleSummary {
            timestamp: world.update_timestamp,
            pilots: world.pilots.len(),
            controllers: world.controllers.len(),
            airports: world.airports.len(),
            changes: delta
                .pilots
                .len()
                .saturating_add(delta.controllers.len())
                .saturating_add(delta.airports.len()),
            delta_bytes: delta_payload.len(),
            snapshot_bytes: snapshot_payload.len(),
        };

        self.publisher
            .publish(Channel::Snapshot, snapshot_payload)
            .await?;
        self.publisher.publish(Channel::Delta, delta_payload).await?;
        Ok(summary)
    }
}

impl<F, P> IngestLoop<F, P>
where
    F: FeedSource + Send + Sync + 'static,
    P: Publisher + Send + Sync + 'static,
{
    /// Drive cycles on a fixed interval until `shutdown` resolves.
    ///
    /// Each tick runs on its own task so a slow cycle cannot delay the
    /// clock; overlapping ticks are rejected by the fetching guard.
    /// Missed ticks are skipped rather than bursted. A cycle in flight when
    /// `shutdown` resolves is awaited before this returns.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()> + Send) {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            precision = ?self.settings.precision,
            suppress_unchanged = self.settings.suppress_unchanged,
            "ingestion loop starting"
        );

        let mut cycles = JoinSet::new();
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(in_flight = cycles.len(), "ingestion loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    while let Some(done) = cycles.try_join_next() {
                        log_join(done);
                    }
                    let this = Arc::clone(&self);
                    cycles.spawn(async move {
                        this.run_cycle().await;
                    });
                }
            }
        }

        while let Some(done) = cycles.join_next().await {
            log_join(done);
        }
        info!("ingestion loop stopped");
    }
}

fn log_join(done: Result<(), JoinError>) {
    if let Err(err) = done {
        warn!(error = %err, "ingestion cycle task failed");
    }
}
