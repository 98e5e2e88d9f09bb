//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading, validation, and error handling.

use std::io::Write;
use tempfile::NamedTempFile;
use tics_monitor::config::{ConfigError, MonitorConfig, DEFAULT_BROKER_URL};
use tics_monitor::protocol::{ALARM_SMOKE_TOPIC, RSSI_TOPIC};
use tics_monitor::telemetry::{DistanceModel, ProximityMode};

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
[device]
id = "esp32-lab"

[mqtt]
broker_url = "mqtt://localhost:1883"
client_id_prefix = "lab-monitor"
max_reconnect_attempts = 3

[topics]
alarm_smoke = "lab/esp32/alarmSmoke"
rssi = "lab/esp32/rssi"
bracelet_near = "lab/esp32/braceletNear"

[proximity]
mode = "direct"
rssi_threshold = -65

[distance]
model = "bucketed"

[notifications]
permission_granted = false
"#,
    );

    let config = MonitorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.device.id, "esp32-lab");
    assert_eq!(config.mqtt.broker_url, "mqtt://localhost:1883");
    assert_eq!(config.mqtt.client_id_prefix, "lab-monitor");
    assert_eq!(config.mqtt.max_reconnect_attempts, 3);
    assert_eq!(config.topics.rssi, "lab/esp32/rssi");
    assert_eq!(config.proximity.mode, ProximityMode::Direct);
    assert_eq!(config.proximity.rssi_threshold, -65);
    assert_eq!(config.distance.model, DistanceModel::Bucketed);
    assert!(!config.notifications.permission_granted);
}

#[test]
fn test_empty_file_uses_defaults() {
    let temp_file = write_config("");

    let config = MonitorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config, MonitorConfig::default());
    assert_eq!(config.mqtt.broker_url, DEFAULT_BROKER_URL);
    assert_eq!(config.topics.alarm_smoke, ALARM_SMOKE_TOPIC);
    assert_eq!(config.topics.rssi, RSSI_TOPIC);
    assert_eq!(config.proximity.mode, ProximityMode::Derived);
    assert_eq!(config.proximity.rssi_threshold, -60);
    assert_eq!(config.mqtt.max_reconnect_attempts, 0);
    assert_eq!(config.distance.tx_power, -52);
    assert!((config.distance.path_loss_exponent - 5.65).abs() < f64::EPSILON);
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let temp_file = write_config(
        r#"
[mqtt]
broker_url = "mqtts://broker.example.com"
"#,
    );

    let config = MonitorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.mqtt.broker_url, "mqtts://broker.example.com");
    assert_eq!(config.mqtt.keep_alive_secs, 60);
    assert_eq!(config.device.id, "esp32-grupo1");
}

#[test]
fn test_missing_file_is_read_error() {
    let result = MonitorConfig::load_from_file(std::path::Path::new(
        "/nonexistent/path/to/tics.toml",
    ));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let temp_file = write_config("[mqtt\nbroker_url = ");
    let result = MonitorConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_invalid_device_id_rejected() {
    let temp_file = write_config(
        r#"
[device]
id = "esp32 grupo1"
"#,
    );
    let result = MonitorConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidDeviceId(_))));
}

#[test]
fn test_wildcard_topic_rejected() {
    let temp_file = write_config(
        r#"
[topics]
rssi = "tics/grupo1/+/tele/rssi"
"#,
    );
    let err = MonitorConfig::load_from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("topics.rssi"), "got: {err}");
}

#[test]
fn test_duplicate_topics_rejected() {
    let temp_file = write_config(
        r#"
[topics]
alarm_smoke = "tics/same"
rssi = "tics/same"
"#,
    );
    let err = MonitorConfig::load_from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("distinct"), "got: {err}");
}

#[test]
fn test_unsupported_broker_scheme_rejected() {
    let temp_file = write_config(
        r#"
[mqtt]
broker_url = "http://broker.hivemq.com:1883"
"#,
    );
    assert!(matches!(
        MonitorConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_non_negative_threshold_rejected() {
    let temp_file = write_config(
        r#"
[proximity]
rssi_threshold = 0
"#,
    );
    assert!(matches!(
        MonitorConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_non_positive_exponent_rejected() {
    let temp_file = write_config(
        r#"
[distance]
path_loss_exponent = 0.0
"#,
    );
    assert!(matches!(
        MonitorConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = MonitorConfig::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    assert_eq!(MonitorConfig::from_toml_str(&rendered).unwrap(), config);
}
