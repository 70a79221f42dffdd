//! Per-entity delta encoder with a last-sent cache.
//!
//! The cache holds what was actually transmitted, not what was last
//! observed. Writes made during a cycle are staged; [`DeltaEncoder::finish_cycle`]
//! replaces the committed cache wholesale with the staged one, so entities
//! that did not appear this cycle drop out without explicit deletion.
//! [`DeltaEncoder::abort_cycle`] discards the staged writes.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::mem;

use tracing::debug;

use crate::delta::{Precision, TrackDelta};
use crate::error::CodecError;
use crate::record::TrackRecord;
use crate::suppression::{Lifecycle, SuppressionFilter};
use crate::track::{TrackPoint, encode};

/// Stateful encoder turning observations into the smallest correct record.
#[derive(Debug, Clone)]
pub struct DeltaEncoder<K> {
    last_sent: BTreeMap<K, TrackPoint>,
    staged: BTreeMap<K, TrackPoint>,
    filter: SuppressionFilter,
}

impl<K: Ord + Clone + Display> DeltaEncoder<K> {
    /// Create an empty encoder using `filter` for change suppression.
    pub const fn new(filter: SuppressionFilter) -> Self {
        Self {
            last_sent: BTreeMap::new(),
            staged: BTreeMap::new(),
            filter,
        }
    }

    /// Encode the next observation for `id`.
    ///
    /// Returns `Ok(None)` when the observation is suppressed. The first
    /// record for an entity with no last-sent state is always full.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the observation cannot be encoded (for
    /// example an altitude off the 100-foot grid). Nothing is staged then.
    pub fn encode_next(
        &mut self,
        id: &K,
        observation: &TrackPoint,
        lifecycle: Lifecycle,
        precision: Precision,
    ) -> Result<Option<TrackRecord>, CodecError> {
        encode(observation)?;

        let previous = self
            .staged
            .get(id)
            .or_else(|| self.last_sent.get(id))
            .copied();

        let Some(previous) = previous else {
            self.staged.insert(id.clone(), *observation);
            return Ok(Some(TrackRecord::Full(*observation)));
        };

        if self
            .filter
            .should_suppress(id, &previous, observation, lifecycle, precision)
        {
            self.staged.insert(id.clone(), previous);
            return Ok(None);
        }

        let delta = TrackDelta::between(&previous, observation, precision);
        self.staged.insert(id.clone(), *observation);
        Ok(Some(TrackRecord::Delta(delta)))
    }

    /// Commit this cycle's staged state as the new last-sent cache.
    ///
    /// Returns the number of entities that dropped out of the cache.
    pub fn finish_cycle(&mut self) -> usize {
        let dropped = self
            .last_sent
            .keys()
            .filter(|id| !self.staged.contains_key(*id))
            .count();
        self.last_sent = mem::take(&mut self.staged);
        debug!(cached = self.last_sent.len(), dropped, "delta encoder cycle committed");
        dropped
    }

    /// Discard everything staged since the last commit.
    pub fn abort_cycle(&mut self) {
        self.staged.clear();
    }

    /// Committed last-sent state for `id`.
    pub fn last_sent(&self, id: &K) -> Option<&TrackPoint> {
        self.last_sent.get(id)
    }

    /// Number of entities in the committed cache.
    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    /// Whether the committed cache is empty.
    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }

    /// The suppression filter in use.
    pub const fn filter(&self) -> SuppressionFilter {
        self.filter
    }
}

impl<K: Ord + Clone + Display> Default for DeltaEncoder<K> {
    fn default() -> Self {
        Self::new(SuppressionFilter::default())
    }
}
