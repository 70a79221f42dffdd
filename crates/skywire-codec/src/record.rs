//! Tagged full/delta records and their JSON embedding.
//!
//! Broker payloads are JSON; telemetry rides inside them as base64 of the
//! binary wire form, tagged `f` (full, 25 bytes) or `d` (delta).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::delta::{TrackDelta, decode_delta, encode_delta};
use crate::error::CodecError;
use crate::track::{TrackPoint, decode, encode};

/// One telemetry record in an entity's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackRecord {
    /// All fields; needs no prior context.
    Full(TrackPoint),
    /// Changed fields only; needs the entity's previous full state.
    Delta(TrackDelta),
}

impl TrackRecord {
    /// Whether this is a full record.
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Observation time of the record.
    pub const fn timestamp(&self) -> u32 {
        match self {
            Self::Full(point) => point.timestamp,
            Self::Delta(delta) => delta.timestamp,
        }
    }

    /// Binary wire form of the record.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from [`encode`] and [`encode_delta`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Full(point) => encode(point).map(|record| record.to_vec()),
            Self::Delta(delta) => encode_delta(delta),
        }
    }

    /// Resolve the record into a full track point.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DeltaWithoutBase`] for a delta with no `base`.
    pub fn resolve(&self, base: Option<&TrackPoint>) -> Result<TrackPoint, CodecError> {
        match (self, base) {
            (Self::Full(point), _) => Ok(*point),
            (Self::Delta(delta), Some(base)) => delta.apply(base),
            (Self::Delta(_), None) => Err(CodecError::DeltaWithoutBase),
        }
    }
}

#[derive(Serialize, Deserialize)]
enum WireRecord {
    #[serde(rename = "f")]
    Full(String),
    #[serde(rename = "d")]
    Delta(String),
}

impl TryFrom<&TrackRecord> for WireRecord {
    type Error = CodecError;

    fn try_from(record: &TrackRecord) -> Result<Self, Self::Error> {
        let encoded = STANDARD.encode(record.to_bytes()?);
        Ok(match record {
            TrackRecord::Full(_) => Self::Full(encoded),
            TrackRecord::Delta(_) => Self::Delta(encoded),
        })
    }
}

impl TryFrom<WireRecord> for TrackRecord {
    type Error = CodecError;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        match wire {
            WireRecord::Full(b64) => decode(&STANDARD.decode(b64)?).map(Self::Full),
            WireRecord::Delta(b64) => decode_delta(&STANDARD.decode(b64)?).map(Self::Delta),
        }
    }
}

impl Serialize for TrackRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRecord::try_from(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TrackRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::try_from(WireRecord::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter embedding a [`TrackPoint`] as a base64 full record.
///
/// Use with `#[serde(with = "skywire_codec::full_record")]` on fields that
/// must always carry a full record.
pub mod full_record {
    use super::{STANDARD, TrackPoint, decode, encode};
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a track point as base64 of its 25-byte record.
    ///
    /// # Errors
    ///
    /// Fails if the point does not validate for encoding.
    pub fn serialize<S: Serializer>(point: &TrackPoint, serializer: S) -> Result<S::Ok, S::Error> {
        let record = encode(point).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&STANDARD.encode(record))
    }

    /// Deserialize a track point from base64 of its 25-byte record.
    ///
    /// # Errors
    ///
    /// Fails on invalid base64 or a record of the wrong length.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TrackPoint, D::Error> {
        let b64 = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(b64).map_err(serde::de::Error::custom)?;
        decode(&bytes).map_err(serde::de::Error::custom)
    }
}
