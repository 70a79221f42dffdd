//! Change suppression for steady entities.
//!
//! A steady entity whose observable fields match what was last sent is not
//! re-sent. Entities at either end of their lifecycle always go out, so the
//! first and last records of a lifecycle are never lost to suppression.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::delta::{FieldMask, Precision};
use crate::track::TrackPoint;

/// Where an entity is in its lifecycle during the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// First cycle the entity is present.
    Pending,
    /// Established and not about to leave.
    #[default]
    Steady,
    /// The feed reports the entity as stale; it is about to be removed.
    Closing,
}

impl Lifecycle {
    /// Whether the entity is starting or ending its lifecycle.
    pub const fn is_transitional(self) -> bool {
        !matches!(self, Self::Steady)
    }
}

/// Bandwidth filter deciding whether an unchanged record is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionFilter {
    enabled: bool,
}

impl SuppressionFilter {
    /// Create a filter; a disabled filter never suppresses.
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether the filter is active.
    pub const fn is_enabled(self) -> bool {
        self.enabled
    }

    /// Decide whether `observation` for `id` can be skipped this cycle.
    pub fn should_suppress<K: Display + ?Sized>(
        self,
        id: &K,
        previous: &TrackPoint,
        observation: &TrackPoint,
        lifecycle: Lifecycle,
        precision: Precision,
    ) -> bool {
        if !self.enabled || lifecycle.is_transitional() {
            return false;
        }
        let unchanged = FieldMask::between(previous, observation, precision).is_empty();
        if unchanged {
            trace!(id = %id, "unchanged steady entity suppressed");
        }
        unchanged
    }
}

impl Default for SuppressionFilter {
    fn default() -> Self {
        Self::new(true)
    }
}
