//! Message types exchanged with the device, the presentation layer and the
//! notification collaborator

use crate::telemetry::distance::DistanceEstimator;
use crate::telemetry::state::Observed;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire value for a field with no information in a status event
pub const NO_DATA: i32 = -1;

/// One incoming message, created per delivery and consumed immediately
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub topic: String,
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

impl TelemetrySample {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// Build a sample from raw MQTT bytes. Invalid UTF-8 is replaced lossily
    /// and later rejected by the codec like any other malformed payload.
    pub fn from_bytes(topic: &[u8], payload: &[u8]) -> Self {
        Self::new(
            String::from_utf8_lossy(topic).into_owned(),
            String::from_utf8_lossy(payload).into_owned(),
        )
    }
}

/// Alert-worthy transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SmokeDetected,
    ProximityLost,
}

impl AlertKind {
    /// Stable notification id; a re-raised alert replaces the previous one
    pub fn notification_id(self) -> i32 {
        match self {
            AlertKind::SmokeDetected => 2,
            AlertKind::ProximityLost => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AlertKind::SmokeDetected => "Smoke alert!",
            AlertKind::ProximityLost => "Bracelet alert!",
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            AlertKind::SmokeDetected => "Smoke or gas detected in the environment.",
            AlertKind::ProximityLost => "Connection with the bracelet was lost.",
        }
    }
}

/// A qualifying state transition, handed to the notifier and then dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub notification_id: i32,
}

impl From<AlertKind> for AlertEvent {
    fn from(kind: AlertKind) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            message: kind.body().to_string(),
            notification_id: kind.notification_id(),
        }
    }
}

/// Consolidated device status, recreated on every publish
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatusSnapshot {
    pub alarm_active: Observed<bool>,
    pub proximity_near: Observed<bool>,
    pub signal_strength: Observed<i32>,
    pub distance_m: Observed<f64>,
}

impl StatusSnapshot {
    /// Flatten into the three-integer wire contract of the presentation layer
    pub fn to_event(&self) -> StatusEvent {
        StatusEvent {
            alarm: self.alarm_active.map(i32::from).unwrap_or(NO_DATA),
            proximity: self.proximity_near.map(i32::from).unwrap_or(NO_DATA),
            signal_strength: self.signal_strength.unwrap_or(NO_DATA),
        }
    }
}

/// Status event delivered to the presentation layer; `-1` means
/// "no information for this field in this event"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub alarm: i32,
    pub proximity: i32,
    pub signal_strength: i32,
}

impl StatusEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What a presentation layer shows, built by merging status events
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusView {
    pub gas_alert: bool,
    pub smoke_alert: bool,
    pub bracelet_connected: bool,
    pub distance_m: f64,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            gas_alert: false,
            smoke_alert: false,
            bracelet_connected: true,
            distance_m: 0.0,
        }
    }
}

impl StatusView {
    /// Merge an event: `-1` fields keep the previous value, distance is
    /// always recomputed from the event's signal strength
    pub fn apply(&mut self, event: &StatusEvent, estimator: &DistanceEstimator) {
        if event.alarm != NO_DATA {
            // The sensor reports smoke and gas on one line
            self.smoke_alert = event.alarm == 1;
            self.gas_alert = event.alarm == 1;
        }

        if event.proximity != NO_DATA {
            self.bracelet_connected = event.proximity == 1;
        }

        self.distance_m = estimator.estimate(event.signal_strength);
    }
}
