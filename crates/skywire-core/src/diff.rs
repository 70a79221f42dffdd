//! Cycle-to-cycle diffing of the derived world.
//!
//! Controllers and airports are compared by value. Pilots go through the
//! [`DeltaEncoder`] so their tracks travel as full or delta records.

use std::collections::BTreeMap;

use skywire_codec::{CodecError, DeltaEncoder, Precision};
use skywire_types::{CollectionDiff, Callsign, Pilot, PilotDiff, PilotUpdate, WorldState, WsDelta};

/// Added, changed, and removed values between two keyed collections.
///
/// A missing `previous` collection means everything in `next` is added.
pub fn diff_collection<K, V>(
    previous: Option<&BTreeMap<K, V>>,
    next: &BTreeMap<K, V>,
) -> CollectionDiff<K, V, V>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    let mut diff = CollectionDiff::default();
    for (key, value) in next {
        match previous.and_then(|previous| previous.get(key)) {
            None => diff.added.push(value.clone()),
            Some(old) if old != value => diff.updated.push(value.clone()),
            Some(_) => {}
        }
    }
    if let Some(previous) = previous {
        diff.removed = previous
            .keys()
            .filter(|key| !next.contains_key(*key))
            .cloned()
            .collect();
    }
    diff
}

/// Diff pilots, running every present pilot through `encoder`.
///
/// New pilots are added with their full track. Pilots present in both
/// worlds produce an update when the encoder emits a record or their
/// details changed.
///
/// # Errors
///
/// Returns a [`CodecError`] if a track fails to encode. The encoder's
/// staged state is then partial and the caller must abort the cycle.
pub fn diff_pilots(
    previous: Option<&BTreeMap<Callsign, Pilot>>,
    next: &BTreeMap<Callsign, Pilot>,
    encoder: &mut DeltaEncoder<Callsign>,
    precision: Precision,
) -> Result<PilotDiff, CodecError> {
    let mut diff = CollectionDiff::default();
    for (callsign, pilot) in next {
        let record = encoder.encode_next(callsign, &pilot.track, pilot.lifecycle, precision)?;
        match previous.and_then(|previous| previous.get(callsign)) {
            None => diff.added.push(pilot.entry()),
            Some(old) => {
                let update = PilotUpdate {
                    callsign: callsign.clone(),
                    track: record,
                    details: (old.details != pilot.details).then(|| pilot.details.clone()),
                };
                if !update.is_empty() {
                    diff.updated.push(update);
                }
            }
        }
    }
    if let Some(previous) = previous {
        diff.removed = previous
            .keys()
            .filter(|callsign| !next.contains_key(*callsign))
            .cloned()
            .collect();
    }
    Ok(diff)
}

/// Build the [`WsDelta`] taking `previous` to `next`.
///
/// # Errors
///
/// Propagates [`diff_pilots`] failures.
pub fn build_delta(
    previous: Option<&WorldState>,
    next: &WorldState,
    encoder: &mut DeltaEncoder<Callsign>,
    precision: Precision,
) -> Result<WsDelta, CodecError> {
    Ok(WsDelta {
        timestamp: next.update_timestamp,
        pilots: diff_pilots(previous.map(|w| &w.pilots), &next.pilots, encoder, precision)?,
        controllers: diff_collection(previous.map(|w| &w.controllers), &next.controllers),
        airports: diff_collection(previous.map(|w| &w.airports), &next.airports),
    })
}
