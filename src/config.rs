//! Monitor configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) yields a monitor for the public HiveMQ broker and the `grupo1`
//! device topics.

use crate::protocol::topics::{
    validate_topic, ALARM_SMOKE_TOPIC, BRACELET_NEAR_TOPIC, RSSI_TOPIC,
};
use crate::telemetry::alert::{ProximityMode, DEFAULT_RSSI_THRESHOLD};
use crate::telemetry::distance::{
    DistanceEstimator, DistanceModel, DEFAULT_PATH_LOSS_EXPONENT, DEFAULT_TX_POWER,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BROKER_URL: &str = "tcp://broker.hivemq.com:1883";

/// Main monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub topics: TopicsSection,
    #[serde(default)]
    pub proximity: ProximitySection,
    #[serde(default)]
    pub distance: DistanceSection,
    #[serde(default)]
    pub notifications: NotificationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    /// Device identifier (must match [a-zA-Z0-9._-]+)
    #[serde(default = "default_device_id")]
    pub id: String,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            id: default_device_id(),
        }
    }
}

fn default_device_id() -> String {
    "esp32-grupo1".to_string()
}

/// MQTT section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker URL: tcp://, mqtt:// or mqtts://
    #[serde(default = "default_broker_url")]
    pub broker_url: String,
    /// Client id prefix; a millisecond timestamp is appended per connection
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// How long to wait for the broker's ConnAck
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 0 means a single connection attempt and no reconnect
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_backoff_pattern_ms")]
    pub backoff_pattern_ms: Vec<u64>,
    #[serde(default = "default_sustained_backoff_ms")]
    pub sustained_backoff_ms: u64,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            client_id_prefix: default_client_id_prefix(),
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_reconnect_attempts: 0,
            backoff_pattern_ms: default_backoff_pattern_ms(),
            sustained_backoff_ms: default_sustained_backoff_ms(),
        }
    }
}

fn default_broker_url() -> String {
    DEFAULT_BROKER_URL.to_string()
}

fn default_client_id_prefix() -> String {
    "tics-monitor".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_backoff_pattern_ms() -> Vec<u64> {
    vec![250, 500, 1000, 2000]
}

fn default_sustained_backoff_ms() -> u64 {
    5000
}

/// Telemetry topics published by the device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicsSection {
    #[serde(default = "default_alarm_smoke_topic")]
    pub alarm_smoke: String,
    #[serde(default = "default_rssi_topic")]
    pub rssi: String,
    /// Only subscribed in direct proximity mode
    #[serde(default = "default_bracelet_near_topic")]
    pub bracelet_near: String,
}

impl Default for TopicsSection {
    fn default() -> Self {
        Self {
            alarm_smoke: default_alarm_smoke_topic(),
            rssi: default_rssi_topic(),
            bracelet_near: default_bracelet_near_topic(),
        }
    }
}

fn default_alarm_smoke_topic() -> String {
    ALARM_SMOKE_TOPIC.to_string()
}

fn default_rssi_topic() -> String {
    RSSI_TOPIC.to_string()
}

fn default_bracelet_near_topic() -> String {
    BRACELET_NEAR_TOPIC.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProximitySection {
    #[serde(default)]
    pub mode: ProximityMode,
    /// Readings strictly above this value (dBm) are "near"
    #[serde(default = "default_rssi_threshold")]
    pub rssi_threshold: i32,
}

impl Default for ProximitySection {
    fn default() -> Self {
        Self {
            mode: ProximityMode::Derived,
            rssi_threshold: default_rssi_threshold(),
        }
    }
}

fn default_rssi_threshold() -> i32 {
    DEFAULT_RSSI_THRESHOLD
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistanceSection {
    #[serde(default)]
    pub model: DistanceModel,
    /// Signal strength at one meter (dBm), log-distance model only
    #[serde(default = "default_tx_power")]
    pub tx_power: i32,
    /// Environment factor, log-distance model only
    #[serde(default = "default_path_loss_exponent")]
    pub path_loss_exponent: f64,
}

impl Default for DistanceSection {
    fn default() -> Self {
        Self {
            model: DistanceModel::LogDistance,
            tx_power: default_tx_power(),
            path_loss_exponent: default_path_loss_exponent(),
        }
    }
}

impl DistanceSection {
    pub fn estimator(&self) -> DistanceEstimator {
        match self.model {
            DistanceModel::LogDistance => {
                DistanceEstimator::log_distance(self.tx_power, self.path_loss_exponent)
            }
            DistanceModel::Bucketed => DistanceEstimator::bucketed(),
        }
    }
}

fn default_tx_power() -> i32 {
    DEFAULT_TX_POWER
}

fn default_path_loss_exponent() -> f64 {
    DEFAULT_PATH_LOSS_EXPONENT
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSection {
    /// Whether the user allowed alert notifications
    #[serde(default = "default_permission_granted")]
    pub permission_granted: bool,
}

impl Default for NotificationSection {
    fn default() -> Self {
        Self {
            permission_granted: default_permission_granted(),
        }
    }
}

fn default_permission_granted() -> bool {
    true
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid device ID format: {0}")]
    InvalidDeviceId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MonitorConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_device_id(&self.device.id)?;
        validate_broker_url(&self.mqtt.broker_url)?;

        let topics = [
            ("alarm_smoke", &self.topics.alarm_smoke),
            ("rssi", &self.topics.rssi),
            ("bracelet_near", &self.topics.bracelet_near),
        ];
        for (name, topic) in topics {
            validate_topic(topic).map_err(|e| {
                ConfigError::InvalidConfig(format!("topics.{name}: {e}"))
            })?;
        }
        if self.topics.alarm_smoke == self.topics.rssi
            || self.topics.alarm_smoke == self.topics.bracelet_near
            || self.topics.rssi == self.topics.bracelet_near
        {
            return Err(ConfigError::InvalidConfig(
                "telemetry topics must be distinct".to_string(),
            ));
        }

        if self.proximity.rssi_threshold >= 0 {
            return Err(ConfigError::InvalidConfig(format!(
                "proximity.rssi_threshold must be negative, got {}",
                self.proximity.rssi_threshold
            )));
        }

        if self.distance.tx_power >= 0 {
            return Err(ConfigError::InvalidConfig(format!(
                "distance.tx_power must be negative, got {}",
                self.distance.tx_power
            )));
        }

        let exponent = self.distance.path_loss_exponent;
        if exponent.is_nan() || exponent <= 0.0 {
            return Err(ConfigError::InvalidConfig(format!(
                "distance.path_loss_exponent must be positive, got {}",
                self.distance.path_loss_exponent
            )));
        }

        if self.mqtt.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validate device ID format
fn validate_device_id(device_id: &str) -> Result<(), ConfigError> {
    let valid_chars = device_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if device_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidDeviceId(format!(
            "Device ID '{device_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}

fn validate_broker_url(broker_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(broker_url)
        .map_err(|e| ConfigError::InvalidConfig(format!("mqtt.broker_url: {e}")))?;

    if !matches!(url.scheme(), "tcp" | "mqtt" | "mqtts") {
        return Err(ConfigError::InvalidConfig(format!(
            "mqtt.broker_url: unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidConfig(format!(
            "mqtt.broker_url: missing host in '{broker_url}'"
        )));
    }

    Ok(())
}
