//! TICS monitor
//!
//! Reconciles the telemetry published over MQTT by an ESP32 smoke sensor and a
//! proximity bracelet into one device state, and raises an alert when smoke is
//! detected or the bracelet moves out of range.
//!
//! # Overview
//!
//! - [`protocol`] - topics, samples, alerts and status snapshots
//! - [`telemetry`] - payload decoding, distance estimation, alert rules and the
//!   reconciliation engine
//! - [`transport`] - MQTT session toward the broker
//! - [`monitor`] - lifecycle tying the transport to the engine
//!
//! # Quick Start
//!
//! ```rust
//! use tics_monitor::config::MonitorConfig;
//! use tics_monitor::notify::LogNotifier;
//! use tics_monitor::protocol::{AlertKind, TelemetrySample, ALARM_SMOKE_TOPIC};
//! use tics_monitor::telemetry::ReconciliationEngine;
//!
//! let config = MonitorConfig::default();
//! let mut engine = ReconciliationEngine::new(&config, Box::new(LogNotifier::new(true)));
//!
//! let outcome = engine
//!     .process(&TelemetrySample::new(ALARM_SMOKE_TOPIC, "1"))
//!     .unwrap();
//! assert_eq!(outcome.alerts[0].kind, AlertKind::SmokeDetected);
//! ```

pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod observability;
pub mod protocol;
pub mod telemetry;
pub mod testing;
pub mod transport;

pub use config::*;
pub use error::{MonitorError, MonitorResult};
pub use monitor::Monitor;
pub use protocol::*;
pub use transport::mqtt::MqttClient;
