//! Telemetry topic names and validation
//!
//! The ESP32 publishes every signal on its own fixed topic under
//! `tics/grupo1/esp32/tele/`. Topics are matched exactly; wildcard filters
//! are never used for subscriptions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Smoke/gas alarm flag, payload `0` or `1`
pub const ALARM_SMOKE_TOPIC: &str = "tics/grupo1/esp32/tele/alarmSmoke";
/// Bracelet signal strength in dBm, payload is a signed decimal integer
pub const RSSI_TOPIC: &str = "tics/grupo1/esp32/tele/rssi";
/// Bracelet proximity flag published by the device itself, payload `0` or `1`
pub const BRACELET_NEAR_TOPIC: &str = "tics/grupo1/esp32/tele/braceletNear";

/// The signals the device publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryChannel {
    AlarmSmoke,
    SignalStrength,
    BraceletNear,
}

impl TelemetryChannel {
    /// Default topic for this channel
    pub fn default_topic(self) -> &'static str {
        match self {
            TelemetryChannel::AlarmSmoke => ALARM_SMOKE_TOPIC,
            TelemetryChannel::SignalStrength => RSSI_TOPIC,
            TelemetryChannel::BraceletNear => BRACELET_NEAR_TOPIC,
        }
    }

    /// Value substituted when the payload is not a decimal integer
    pub fn parse_fallback(self) -> i32 {
        match self {
            TelemetryChannel::AlarmSmoke | TelemetryChannel::BraceletNear => 0,
            TelemetryChannel::SignalStrength => -1,
        }
    }
}

impl fmt::Display for TelemetryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TelemetryChannel::AlarmSmoke => "alarm_smoke",
            TelemetryChannel::SignalStrength => "rssi",
            TelemetryChannel::BraceletNear => "bracelet_near",
        };
        f.write_str(name)
    }
}

/// Check that a topic can be used as an exact-match subscription
pub fn validate_topic(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }

    if let Some(ch) = topic.chars().find(|c| matches!(c, '+' | '#' | '\0')) {
        return Err(TopicError::InvalidChar {
            topic: topic.to_string(),
            ch,
        });
    }

    Ok(())
}

#[derive(Debug, Error, PartialEq)]
pub enum TopicError {
    #[error("Topic cannot be empty")]
    Empty,
    #[error("Topic '{topic}' contains invalid character: '{ch}'")]
    InvalidChar { topic: String, ch: char },
}
