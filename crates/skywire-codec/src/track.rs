//! Fixed-length binary telemetry record.
//!
//! A [`TrackPoint`] is one observation of a moving entity. On the wire a
//! full record is always exactly [`RECORD_LEN`] bytes, big-endian:
//!
//! | Offset | Size | Field | Encoding |
//! |--------|------|-------|----------|
//! | 0  | 4 | x coordinate | `i32` |
//! | 4  | 4 | y coordinate | `i32` |
//! | 8  | 2 | MSL altitude / 100 | `i16` |
//! | 10 | 2 | AGL altitude / 100 | `i16` |
//! | 12 | 2 | ground speed | `i16` |
//! | 14 | 2 | vertical speed | `i16` |
//! | 16 | 2 | heading | `u16` |
//! | 18 | 1 | color red | `u8` |
//! | 19 | 1 | color green | `u8` |
//! | 20 | 1 | color blue | `u8` |
//! | 21 | 4 | timestamp (unix seconds) | `u32` |

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CodecError;

/// Length in bytes of a full telemetry record.
pub const RECORD_LEN: usize = 25;

/// Altitudes travel in steps of this many feet.
pub const ALTITUDE_STEP: i32 = 100;

/// Display color of a track, derived from its state rather than observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Build a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack the color as `0xRRGGBB`.
    pub fn packed(self) -> u32 {
        u32::from_be_bytes([0, self.r, self.g, self.b])
    }

    /// Unpack a `0xRRGGBB` value. Bits above the low 24 are ignored.
    pub const fn from_packed(value: u32) -> Self {
        let [_, r, g, b] = value.to_be_bytes();
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = CodecError;

    /// Parse `#rrggbb` or `rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CodecError::Color(s.to_owned()));
        }
        u32::from_str_radix(hex, 16)
            .map(Self::from_packed)
            .map_err(|e| CodecError::Color(format!("{s}: {e}")))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Telemetry of one entity at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Projected x coordinate in meters.
    pub x: i32,
    /// Projected y coordinate in meters.
    pub y: i32,
    /// Barometric altitude in feet, a multiple of 100.
    pub alt_msl: i32,
    /// Height above ground in feet, a multiple of 100.
    pub alt_agl: i32,
    /// Ground speed in knots.
    pub groundspeed: i16,
    /// Vertical speed in feet per minute.
    pub vertical_speed: i16,
    /// Heading in whole degrees, 0 to 359.
    pub heading: u16,
    /// Derived display color.
    pub color: Color,
    /// Observation time in unix seconds.
    pub timestamp: u32,
}

/// Round an altitude in feet to the nearest multiple of [`ALTITUDE_STEP`].
///
/// Halves round away from zero. Non-finite input maps to 0 and results are
/// clamped to the range the wire format can carry.
#[allow(clippy::cast_possible_truncation)]
pub fn round_altitude(feet: f64) -> i32 {
    if !feet.is_finite() {
        return 0;
    }
    let max = f64::from(i16::MAX) * f64::from(ALTITUDE_STEP);
    let min = f64::from(i16::MIN) * f64::from(ALTITUDE_STEP);
    let step = f64::from(ALTITUDE_STEP);
    ((feet / step).round() * step).clamp(min, max) as i32
}

/// Convert an altitude in feet to its `/100` wire unit.
pub(crate) fn altitude_units(feet: i32, field: &'static str) -> Result<i16, CodecError> {
    if feet.rem_euclid(ALTITUDE_STEP) != 0 {
        return Err(CodecError::Altitude { field, value: feet });
    }
    narrow(feet.div_euclid(ALTITUDE_STEP), field)
}

/// Convert a `/100` wire unit back to feet.
pub(crate) fn altitude_feet(units: i16) -> i32 {
    i32::from(units).saturating_mul(ALTITUDE_STEP)
}

/// Narrow an `i32` field value to its wire width.
pub(crate) fn narrow<T: TryFrom<i32>>(value: i32, field: &'static str) -> Result<T, CodecError> {
    T::try_from(value).map_or(Err(CodecError::ValueRange { field, value }), Ok)
}

/// Encode a full track point into its 25-byte record.
///
/// # Errors
///
/// Returns [`CodecError::Altitude`] if either altitude is not a multiple of
/// 100, or [`CodecError::ValueRange`] if an altitude overflows the wire width.
pub fn encode(point: &TrackPoint) -> Result<[u8; RECORD_LEN], CodecError> {
    let alt_msl = altitude_units(point.alt_msl, "alt_msl")?;
    let alt_agl = altitude_units(point.alt_agl, "alt_agl")?;

    let mut record = [0_u8; RECORD_LEN];
    let mut buf = record.as_mut_slice();
    buf.put_i32(point.x);
    buf.put_i32(point.y);
    buf.put_i16(alt_msl);
    buf.put_i16(alt_agl);
    buf.put_i16(point.groundspeed);
    buf.put_i16(point.vertical_speed);
    buf.put_u16(point.heading);
    buf.put_u8(point.color.r);
    buf.put_u8(point.color.g);
    buf.put_u8(point.color.b);
    buf.put_u32(point.timestamp);
    Ok(record)
}

/// Decode a 25-byte record into a full track point.
///
/// Any 25 bytes decode; semantic plausibility is the producer's concern.
///
/// # Errors
///
/// Returns [`CodecError::Length`] if `bytes` is not exactly [`RECORD_LEN`] long.
pub fn decode(bytes: &[u8]) -> Result<TrackPoint, CodecError> {
    if bytes.len() != RECORD_LEN {
        return Err(CodecError::Length {
            expected: RECORD_LEN,
            actual: bytes.len(),
        });
    }

    let mut buf = bytes;
    Ok(TrackPoint {
        x: buf.get_i32(),
        y: buf.get_i32(),
        alt_msl: altitude_feet(buf.get_i16()),
        alt_agl: altitude_feet(buf.get_i16()),
        groundspeed: buf.get_i16(),
        vertical_speed: buf.get_i16(),
        heading: buf.get_u16(),
        color: Color::new(buf.get_u8(), buf.get_u8(), buf.get_u8()),
        timestamp: buf.get_u32(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn sample() -> TrackPoint {
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

    #[test]
    fn encodes_big_endian_layout() {
        let record = encode(&sample()).unwrap();
        assert_eq!(record.len(), RECORD_LEN);
        assert_eq!(&record[0..4], &100_i32.to_be_bytes());
        assert_eq!(&record[4..8], &200_i32.to_be_bytes());
        assert_eq!(&record[8..10], &10_i16.to_be_bytes());
        assert_eq!(&record[10..12], &5_i16.to_be_bytes());
        assert_eq!(&record[12..14], &250_i16.to_be_bytes());
        assert_eq!(&record[16..18], &90_u16.to_be_bytes());
        assert_eq!(&record[18..21], &[0xff, 0, 0]);
        assert_eq!(&record[21..25], &1000_u32.to_be_bytes());
    }

    #[test]
    fn decode_inverts_encode() {
        let point = sample();
        assert_eq!(decode(&encode(&point).unwrap()).unwrap(), point);
    }

    #[test]
    fn rejects_unrounded_altitude() {
        let mut point = sample();
        point.alt_agl = 550;
        let err = encode(&point).unwrap_err();
        assert!(matches!(err, CodecError::Altitude { field: "alt_agl", value: 550 }));
    }

    #[test]
    fn rejects_altitude_beyond_wire_range() {
        let mut point = sample();
        point.alt_msl = 4_000_000;
        assert!(matches!(encode(&point), Err(CodecError::ValueRange { .. })));
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = decode(&[0_u8; 24]).unwrap_err();
        assert!(matches!(err, CodecError::Length { expected: 25, actual: 24 }));
        assert!(decode(&[0_u8; 26]).is_err());
    }

    #[test]
    fn decode_is_total_over_garbage() {
        let point = decode(&[0xff_u8; RECORD_LEN]).unwrap();
        assert_eq!(point.x, -1);
        assert_eq!(point.alt_msl, -100);
        assert_eq!(point.heading, u16::MAX);
    }

    #[test]
    fn color_parsing() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::new(0xff, 0x80, 0));
        assert_eq!("00ff00".parse::<Color>().unwrap(), Color::new(0, 0xff, 0));
        assert!("#fff".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert!("+ff0000".parse::<Color>().is_err());
        assert_eq!(Color::new(0x12, 0x34, 0x56).packed(), 0x0012_3456);
        assert_eq!(Color::new(0xab, 0xcd, 0xef).to_string(), "#abcdef");
    }

    #[test]
    fn rounds_altitude_to_hundreds() {
        assert_eq!(round_altitude(1049.0), 1000);
        assert_eq!(round_altitude(1050.0), 1100);
        assert_eq!(round_altitude(-1050.0), -1100);
        assert_eq!(round_altitude(f64::NAN), 0);
        assert_eq!(round_altitude(1.0e12), 3_276_700);
    }
}
