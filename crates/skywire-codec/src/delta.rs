//! Field masks and partial (delta) telemetry records.
//!
//! A delta carries only the fields that changed since the last record sent
//! for the same entity. Bit positions:
//!
//! | Bit | Field | Values | Wire width |
//! |-----|-------|--------|------------|
//! | 0 | coordinates | x, y | 2 x `i32` |
//! | 1 | MSL altitude | feet | `i16` (/100) |
//! | 2 | AGL altitude | feet | `i16` (/100) |
//! | 3 | ground speed | knots | `i16` |
//! | 4 | vertical speed | ft/min | `i16` |
//! | 5 | heading | degrees | `u16` |
//! | 6 | color | `0xRRGGBB` | 3 bytes |
//!
//! The delta wire form is `mask u8`, the present fields in bit order, then
//! the timestamp as `u32`. The timestamp is never part of the mask.

use std::ops::BitOr;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::track::{Color, TrackPoint, altitude_feet, altitude_units, narrow};

/// Set of changed fields in a delta record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldMask(u8);

impl FieldMask {
    /// No fields.
    pub const EMPTY: Self = Self(0);
    /// Projected coordinates (contributes two values).
    pub const COORDS: Self = Self(0b000_0001);
    /// Barometric altitude.
    pub const ALT_MSL: Self = Self(0b000_0010);
    /// Height above ground.
    pub const ALT_AGL: Self = Self(0b000_0100);
    /// Ground speed.
    pub const GROUNDSPEED: Self = Self(0b000_1000);
    /// Vertical speed.
    pub const VERTICAL_SPEED: Self = Self(0b001_0000);
    /// Heading.
    pub const HEADING: Self = Self(0b010_0000);
    /// Display color.
    pub const COLOR: Self = Self(0b100_0000);
    /// Every defined field.
    pub const ALL: Self = Self(0b111_1111);

    /// Fields in the order their values are written.
    pub const FIELD_ORDER: [Self; 7] = [
        Self::COORDS,
        Self::ALT_MSL,
        Self::ALT_AGL,
        Self::GROUNDSPEED,
        Self::VERTICAL_SPEED,
        Self::HEADING,
        Self::COLOR,
    ];

    /// Raw mask bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a mask from raw bits, rejecting undefined bits.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bits set in both masks.
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Compute which fields differ between two observations, restricted to
    /// the fields that participate at `precision`.
    pub fn between(previous: &TrackPoint, observation: &TrackPoint, precision: Precision) -> Self {
        let mut mask = Self::EMPTY;
        if previous.x != observation.x || previous.y != observation.y {
            mask = mask | Self::COORDS;
        }
        if previous.alt_msl != observation.alt_msl {
            mask = mask | Self::ALT_MSL;
        }
        if previous.alt_agl != observation.alt_agl {
            mask = mask | Self::ALT_AGL;
        }
        if previous.groundspeed != observation.groundspeed {
            mask = mask | Self::GROUNDSPEED;
        }
        if previous.vertical_speed != observation.vertical_speed {
            mask = mask | Self::VERTICAL_SPEED;
        }
        if previous.heading != observation.heading {
            mask = mask | Self::HEADING;
        }
        if previous.color != observation.color {
            mask = mask | Self::COLOR;
        }
        mask.intersection(precision.participating())
    }

    /// Iterate the set fields in value order.
    pub fn fields(self) -> impl Iterator<Item = Self> {
        Self::FIELD_ORDER
            .into_iter()
            .filter(move |field| self.contains(*field))
    }

    /// Number of values a delta with this mask carries.
    pub fn value_count(self) -> usize {
        self.fields()
            .map(|field| if field == Self::COORDS { 2 } else { 1 })
            .sum()
    }

    /// Number of payload bytes the set fields occupy on the wire.
    pub fn wire_len(self) -> usize {
        self.fields()
            .map(|field| match field {
                Self::COORDS => 8,
                Self::COLOR => 3,
                _ => 2,
            })
            .sum()
    }
}

impl BitOr for FieldMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// How many fields take part in change detection.
///
/// `Reduced` serves high-frequency, low-bandwidth consumers: AGL altitude,
/// vertical speed, and heading changes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Every field participates.
    #[default]
    Full,
    /// Only coordinates, MSL altitude, ground speed, and color participate.
    Reduced,
}

impl Precision {
    /// Map the boolean `full` flag onto a precision.
    pub const fn from_full_flag(full: bool) -> Self {
        if full { Self::Full } else { Self::Reduced }
    }

    /// Fields that participate in masking at this precision.
    pub const fn participating(self) -> FieldMask {
        match self {
            Self::Full => FieldMask::ALL,
            Self::Reduced => FieldMask(
                FieldMask::COORDS.0 | FieldMask::ALT_MSL.0 | FieldMask::GROUNDSPEED.0 | FieldMask::COLOR.0,
            ),
        }
    }
}

/// A partial track record: mask, changed values, and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackDelta {
    /// Which fields changed.
    pub mask: FieldMask,
    /// New values of the changed fields, in mask order.
    pub values: Vec<i32>,
    /// Observation time in unix seconds.
    pub timestamp: u32,
}

impl TrackDelta {
    /// Build the delta that turns `previous` into `observation`.
    pub fn between(previous: &TrackPoint, observation: &TrackPoint, precision: Precision) -> Self {
        Self::from_mask(FieldMask::between(previous, observation, precision), observation)
    }

    /// Build a delta carrying the `mask` fields of `observation`.
    pub fn from_mask(mask: FieldMask, observation: &TrackPoint) -> Self {
        let mut values = Vec::with_capacity(mask.value_count());
        for field in mask.fields() {
            match field {
                FieldMask::COORDS => {
                    values.push(observation.x);
                    values.push(observation.y);
                }
                FieldMask::ALT_MSL => values.push(observation.alt_msl),
                FieldMask::ALT_AGL => values.push(observation.alt_agl),
                FieldMask::GROUNDSPEED => values.push(i32::from(observation.groundspeed)),
                FieldMask::VERTICAL_SPEED => values.push(i32::from(observation.vertical_speed)),
                FieldMask::HEADING => values.push(i32::from(observation.heading)),
                _ => values.push(packed_color(observation.color)),
            }
        }
        Self {
            mask,
            values,
            timestamp: observation.timestamp,
        }
    }

    /// Whether the delta carries no field values (timestamp only).
    pub const fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Apply this delta to a full record, producing the next full record.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ValueCount`] if the values do not match the
    /// mask, or [`CodecError::ValueRange`] if a value overflows its field.
    pub fn apply(&self, base: &TrackPoint) -> Result<TrackPoint, CodecError> {
        self.check_value_count()?;
        let mut values = self.values.iter().copied();
        let mut next = || values.next().unwrap_or_default();

        let mut point = *base;
        for field in self.mask.fields() {
            match field {
                FieldMask::COORDS => {
                    point.x = next();
                    point.y = next();
                }
                FieldMask::ALT_MSL => point.alt_msl = next(),
                FieldMask::ALT_AGL => point.alt_agl = next(),
                FieldMask::GROUNDSPEED => point.groundspeed = narrow(next(), "groundspeed")?,
                FieldMask::VERTICAL_SPEED => {
                    point.vertical_speed = narrow(next(), "vertical_speed")?;
                }
                FieldMask::HEADING => point.heading = narrow(next(), "heading")?,
                _ => point.color = color_from_value(next())?,
            }
        }
        point.timestamp = self.timestamp;
        Ok(point)
    }

    fn check_value_count(&self) -> Result<(), CodecError> {
        let expected = self.mask.value_count();
        if self.values.len() == expected {
            Ok(())
        } else {
            Err(CodecError::ValueCount {
                expected,
                actual: self.values.len(),
            })
        }
    }
}

fn packed_color(color: Color) -> i32 {
    i32::from_be_bytes([0, color.r, color.g, color.b])
}

fn color_from_value(value: i32) -> Result<Color, CodecError> {
    match value.to_be_bytes() {
        [0, r, g, b] => Ok(Color::new(r, g, b)),
        _ => Err(CodecError::ValueRange {
            field: "color",
            value,
        }),
    }
}

/// Encode a delta into its variable-length wire form.
///
/// # Errors
///
/// Returns [`CodecError::ValueCount`] if the values do not match the mask,
/// [`CodecError::Altitude`] for altitudes off the 100-foot grid, or
/// [`CodecError::ValueRange`] for values that overflow their wire width.
pub fn encode_delta(delta: &TrackDelta) -> Result<Vec<u8>, CodecError> {
    delta.check_value_count()?;
    let mut buf = Vec::with_capacity(delta.mask.wire_len().saturating_add(5));
    buf.put_u8(delta.mask.bits());

    let mut values = delta.values.iter().copied();
    let mut next = || values.next().unwrap_or_default();
    for field in delta.mask.fields() {
        match field {
            FieldMask::COORDS => {
                buf.put_i32(next());
                buf.put_i32(next());
            }
            FieldMask::ALT_MSL => buf.put_i16(altitude_units(next(), "alt_msl")?),
            FieldMask::ALT_AGL => buf.put_i16(altitude_units(next(), "alt_agl")?),
            FieldMask::GROUNDSPEED => buf.put_i16(narrow(next(), "groundspeed")?),
            FieldMask::VERTICAL_SPEED => buf.put_i16(narrow(next(), "vertical_speed")?),
            FieldMask::HEADING => buf.put_u16(narrow(next(), "heading")?),
            _ => {
                let color = color_from_value(next())?;
                buf.put_slice(&[color.r, color.g, color.b]);
            }
        }
    }
    buf.put_u32(delta.timestamp);
    Ok(buf)
}

/// Decode a delta from its wire form.
///
/// # Errors
///
/// Returns [`CodecError::UnknownMask`] for undefined mask bits and
/// [`CodecError::Length`] when the byte count disagrees with the mask.
pub fn decode_delta(bytes: &[u8]) -> Result<TrackDelta, CodecError> {
    let mut buf = bytes;
    if !buf.has_remaining() {
        return Err(CodecError::Length {
            expected: 5,
            actual: 0,
        });
    }
    let bits = buf.get_u8();
    let mask = FieldMask::from_bits(bits).ok_or(CodecError::UnknownMask(bits))?;

    let expected = mask.wire_len().saturating_add(5);
    if bytes.len() != expected {
        return Err(CodecError::Length {
            expected,
            actual: bytes.len(),
        });
    }

    let mut values = Vec::with_capacity(mask.value_count());
    for field in mask.fields() {
        match field {
            FieldMask::COORDS => {
                values.push(buf.get_i32());
                values.push(buf.get_i32());
            }
            FieldMask::ALT_MSL | FieldMask::ALT_AGL => values.push(altitude_feet(buf.get_i16())),
            FieldMask::GROUNDSPEED | FieldMask::VERTICAL_SPEED => {
                values.push(i32::from(buf.get_i16()));
            }
            FieldMask::HEADING => values.push(i32::from(buf.get_u16())),
            _ => values.push(packed_color(Color::new(buf.get_u8(), buf.get_u8(), buf.get_u8()))),
        }
    }

    Ok(TrackDelta {
        mask,
        values,
        timestamp: buf.get_u32(),
    })
}
