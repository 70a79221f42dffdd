//! Type-safe identifier wrappers around callsigns and airport codes.
//!
//! Every entity in the world feed is keyed by a stable string identifier.
//! Wrapping them prevents a controller callsign from being used to look up
//! an airport, and normalises case so `aal123` and `AAL123` are one entity.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around an upper-cased [`String`].
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, trimmed and upper-cased.
            pub fn new(value: impl AsRef<str>) -> Self {
                Self(value.as_ref().trim().to_ascii_uppercase())
            }

            /// Borrow the identifier text.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`].
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Radio callsign of a pilot or controller session.
    Callsign
}

define_id! {
    /// Four-letter ICAO airport code.
    AirportCode
}

impl AirportCode {
    /// Parse a string as an ICAO code: exactly four ASCII letters.
    pub fn parse_icao(value: &str) -> Option<Self> {
        let value = value.trim();
        (value.len() == 4 && value.bytes().all(|b| b.is_ascii_alphabetic())).then(|| Self::new(value))
    }
}

impl Callsign {
    /// The facility prefix of a controller callsign (`KJFK` in `KJFK_TWR`).
    pub fn prefix(&self) -> &str {
        self.0.split('_').next().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_normalise_case_and_whitespace() {
        assert_eq!(Callsign::new(" aal123 "), Callsign::from("AAL123"));
        assert_eq!(Callsign::new("dal1").to_string(), "DAL1");
    }

    #[test]
    fn icao_parsing() {
        assert_eq!(AirportCode::parse_icao("kjfk"), Some(AirportCode::new("KJFK")));
        assert_eq!(AirportCode::parse_icao("JFK"), None);
        assert_eq!(AirportCode::parse_icao("K1FK"), None);
    }

    #[test]
    fn callsign_prefix() {
        assert_eq!(Callsign::new("KJFK_TWR").prefix(), "KJFK");
        assert_eq!(Callsign::new("EGLL_N_APP").prefix(), "EGLL");
        assert_eq!(Callsign::new("BAW1").prefix(), "BAW1");
    }
}
