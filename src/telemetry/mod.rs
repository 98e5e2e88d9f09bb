//! Telemetry reconciliation and alerting
//!
//! - [`codec`] - payload decoding with fallbacks
//! - [`state`] - last-known device state
//! - [`distance`] - distance from signal strength
//! - [`alert`] - edge-triggered alert decisions
//! - [`router`] - topic to pipeline dispatch
//! - [`publisher`] - status fan-out to observers
//! - [`engine`] - ties the above together for one device

pub mod alert;
pub mod codec;
pub mod distance;
pub mod engine;
pub mod publisher;
pub mod router;
pub mod state;

pub use alert::{AlertEvaluator, ProximityMode};
pub use codec::{ParseError, PayloadCodec};
pub use distance::{DistanceEstimator, DistanceModel};
pub use engine::{ProcessOutcome, ReconciliationEngine};
pub use publisher::{ChannelObserver, StatusObserver, StatusPublisher};
pub use router::{RoutedValue, TopicRouter};
pub use state::{DeviceState, DeviceStateStore, Observed};
