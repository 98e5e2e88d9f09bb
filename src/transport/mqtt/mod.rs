//! MQTT client for the smoke sensor and bracelet telemetry feed
//!
//! The client separates pure functions from I/O operations:
//!
//! - [`connection`] - Pure connection state, broker URL parsing and options
//! - [`message_handler`] - Pure event routing and sample forwarding
//! - [`health_monitor`] - Pure reconnection decisions
//! - [`client`] - Impure I/O operations and coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use tics_monitor::config::MqttSection;
//! use tics_monitor::transport::mqtt::MqttClient;
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection {
//!     broker_url: "tcp://broker.hivemq.com:1883".to_string(),
//!     ..MqttSection::default()
//! };
//! let topics = vec!["tics/grupo1/esp32/tele/alarmSmoke".to_string()];
//!
//! let mut client = MqttClient::new(&config, topics)?;
//! client.connect().await?;
//! client.subscribe_telemetry().await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod health_monitor;
pub mod message_handler;

pub use client::MqttClient;
pub use connection::{
    configure_mqtt_options, generate_client_id, parse_broker_url, BrokerAddress, ConnectionState,
    MqttError, ReconnectConfig,
};
pub use health_monitor::{ConnectionEvent, HealthMonitor, ReconnectionDecision};
pub use message_handler::{EventRoute, MessageHandler, SampleForwarder, TELEMETRY_QOS};
