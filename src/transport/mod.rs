//! Transport layer for telemetry ingestion
//!
//! This module provides the transport abstraction and its MQTT implementation.

use crate::protocol::TelemetrySample;
use crate::transport::mqtt::ConnectionState;
use tokio::sync::mpsc;

pub mod mqtt;

/// Transport trait for telemetry ingestion
///
/// Abstraction over the broker session so the monitor can be driven by a
/// mock in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open the session; resolves once the broker acknowledged it
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Subscribe to every telemetry topic
    async fn subscribe_telemetry(&mut self) -> Result<(), Self::Error>;

    /// Close the session. Calling it again is a no-op.
    async fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Check if transport is currently connected
    fn is_connected(&self) -> bool;

    /// Get current connection state
    fn connection_state(&self) -> Option<ConnectionState>;

    /// Set the sender that receives every telemetry sample
    async fn set_sample_sender(&self, sender: mpsc::Sender<TelemetrySample>);
}

/// Type alias for MQTT transport
pub type MqttTransport = mqtt::MqttClient;
