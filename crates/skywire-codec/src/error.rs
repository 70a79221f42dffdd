//! Error types for the telemetry codec.
//!
//! Encoding is strict (the producer validates), decoding is total over any
//! correctly sized input. Length mismatches are integration errors and
//! always surface as [`CodecError::Length`] instead of silently truncating.

/// Errors produced while encoding, decoding, or applying telemetry records.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An altitude field was not a multiple of 100 feet.
    #[error("{field} must be a multiple of 100, got {value}")]
    Altitude {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: i32,
    },

    /// A value does not fit the width its field has on the wire.
    #[error("{field} value {value} does not fit its wire encoding")]
    ValueRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: i32,
    },

    /// A color string was not exactly six hexadecimal digits.
    #[error("invalid color {0:?}, expected six hex digits")]
    Color(String),

    /// A byte record had the wrong length.
    #[error("record length mismatch: expected {expected} bytes, got {actual}")]
    Length {
        /// Number of bytes the record layout requires.
        expected: usize,
        /// Number of bytes actually supplied.
        actual: usize,
    },

    /// A delta record carried mask bits outside the defined field set.
    #[error("unknown field mask bits {0:#010b}")]
    UnknownMask(u8),

    /// A delta record's value list does not match its mask.
    #[error("delta value count mismatch: mask announces {expected}, got {actual}")]
    ValueCount {
        /// Number of values the mask requires.
        expected: usize,
        /// Number of values present.
        actual: usize,
    },

    /// A delta record was applied with no full record to apply it to.
    #[error("delta record has no full record to apply to")]
    DeltaWithoutBase,

    /// An embedded record was not valid base64.
    #[error("invalid base64 record: {0}")]
    Base64(#[from] base64::DecodeError),
}
