//! Payload decoding with deterministic fallbacks
//!
//! The device publishes plain ASCII decimal integers. A malformed payload must
//! never take the engine down, so callers use [`PayloadCodec::parse_integer`]
//! and supply the value to substitute.

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Payload is empty")]
    Empty,
    #[error("Payload is not a decimal integer: {0:?}")]
    NotAnInteger(String),
}

pub struct PayloadCodec;

impl PayloadCodec {
    /// Strict decimal parse: optional sign followed by ASCII digits, nothing else
    pub fn parse_strict(payload: &str) -> Result<i32, ParseError> {
        if payload.is_empty() {
            return Err(ParseError::Empty);
        }

        payload
            .parse::<i32>()
            .map_err(|_| ParseError::NotAnInteger(payload.to_string()))
    }

    /// Parse, substituting `fallback` on malformed input
    pub fn parse_integer(payload: &str, fallback: i32) -> i32 {
        match Self::parse_strict(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(payload = %payload, fallback, "Malformed payload, using fallback: {}", e);
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_valid_integers() {
        assert_eq!(PayloadCodec::parse_strict("0"), Ok(0));
        assert_eq!(PayloadCodec::parse_strict("1"), Ok(1));
        assert_eq!(PayloadCodec::parse_strict("-75"), Ok(-75));
        assert_eq!(PayloadCodec::parse_strict("+3"), Ok(3));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(PayloadCodec::parse_strict(""), Err(ParseError::Empty));
        assert!(PayloadCodec::parse_strict(" 1").is_err());
        assert!(PayloadCodec::parse_strict("1\n").is_err());
        assert!(PayloadCodec::parse_strict("1.0").is_err());
        assert!(PayloadCodec::parse_strict("on").is_err());
        assert!(PayloadCodec::parse_strict("99999999999").is_err());
    }

    #[test]
    fn test_parse_integer_uses_fallback() {
        assert_eq!(PayloadCodec::parse_integer("garbage", 0), 0);
        assert_eq!(PayloadCodec::parse_integer("garbage", -1), -1);
        assert_eq!(PayloadCodec::parse_integer("-60", -1), -60);
    }

    proptest! {
        #[test]
        fn parse_integer_never_fails_on_non_numeric(payload in "[^0-9]*") {
            // Without any digit nothing can parse, so the fallback always wins
            prop_assert_eq!(PayloadCodec::parse_integer(&payload, 0), 0);
            prop_assert_eq!(PayloadCodec::parse_integer(&payload, -1), -1);
        }

        #[test]
        fn parse_integer_round_trips_valid_values(value in any::<i32>()) {
            prop_assert_eq!(PayloadCodec::parse_integer(&value.to_string(), 0), value);
        }
    }
}
