//! Testing utilities and mock implementations
//!
//! Mocks for the transport, the alert notifier and status observers so the
//! monitor can be exercised without an MQTT broker.

pub mod mocks;

pub use mocks::*;
