// Config loading and validation tests

use solar_telemetry::config::AppConfig;
use solar_telemetry::models::Metric;
use solar_telemetry::projection::LabelTimezone;

const VALID_CONFIG: &str = r#"
[stream]
url = "ws://localhost:8080/ws"
device_ids = ["esp32-001", "esp32-002"]

[server]
port = 8090
host = "0.0.0.0"

[publishing]
broadcast_capacity = 32

[monitoring]
stats_log_interval_secs = 60
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.stream.url, "ws://localhost:8080/ws");
    assert_eq!(config.stream.device_ids, vec!["esp32-001", "esp32-002"]);
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.publishing.broadcast_capacity, 32);
    assert_eq!(config.monitoring.stats_log_interval_secs, 60);
}

#[test]
fn test_config_defaults_when_omitted() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    assert_eq!(config.window.capacity, 100);
    assert_eq!(config.stream.selected_device, None);
    assert_eq!(config.stream.connect_timeout_ms, 5_000);
    assert!(config.stream.reconnect.enabled);
    assert_eq!(config.stream.reconnect.max_attempts, 5);
    assert_eq!(config.stream.reconnect.initial_backoff_ms, 500);
    assert_eq!(config.stream.reconnect.max_backoff_ms, 10_000);
    assert_eq!(config.publishing.command_queue_capacity, 64);
    assert_eq!(config.chart.label_timezone, LabelTimezone::Utc);
    assert_eq!(config.chart.default_metrics, vec![Metric::SolarPanelTemp]);
}

const FULL_CONFIG: &str = r#"
[stream]
url = "wss://relay.example.com/ws"
device_ids = ["A", "B"]
selected_device = "B"
connect_timeout_ms = 2000

[stream.reconnect]
enabled = false
max_attempts = 0
initial_backoff_ms = 0
max_backoff_ms = 0

[window]
capacity = 250

[server]
port = 8090
host = "127.0.0.1"

[publishing]
broadcast_capacity = 8
command_queue_capacity = 4

[monitoring]
stats_log_interval_secs = 30

[chart]
label_timezone = "local"
default_metrics = ["voltage", "current"]
"#;

#[test]
fn test_config_loads_all_sections() {
    let config = AppConfig::load_from_str(FULL_CONFIG).expect("valid");
    assert_eq!(config.stream.selected_device.as_deref(), Some("B"));
    assert!(!config.stream.reconnect.enabled);
    assert_eq!(config.window.capacity, 250);
    assert_eq!(config.chart.label_timezone, LabelTimezone::Local);
    assert_eq!(
        config.chart.default_metrics,
        vec![Metric::Voltage, Metric::Current]
    );
}

#[test]
fn test_config_validation_rejects_http_url() {
    let bad = VALID_CONFIG.replace("ws://localhost", "http://localhost");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("stream.url"));
}

#[test]
fn test_config_validation_rejects_empty_device_ids() {
    let bad = VALID_CONFIG.replace(r#"["esp32-001", "esp32-002"]"#, "[]");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("stream.device_ids"));
}

#[test]
fn test_config_validation_rejects_unsubscribed_selected_device() {
    let bad = FULL_CONFIG.replace(r#"selected_device = "B""#, r#"selected_device = "Z""#);
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("selected_device"));
}

#[test]
fn test_config_validation_rejects_zero_backoff_when_reconnect_enabled() {
    let bad = FULL_CONFIG
        .replace("enabled = false", "enabled = true")
        .replace("max_attempts = 0", "max_attempts = 3");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("initial_backoff_ms"));
}

#[test]
fn test_config_validation_rejects_zero_attempts_when_reconnect_enabled() {
    let bad = format!("{VALID_CONFIG}\n[stream.reconnect]\nmax_attempts = 0\n");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn test_config_validation_rejects_window_capacity_zero() {
    let bad = FULL_CONFIG.replace("capacity = 250", "capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("window.capacity"));
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8090", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_broadcast_capacity_zero() {
    let bad = VALID_CONFIG.replace("broadcast_capacity = 32", "broadcast_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("broadcast_capacity"));
}

#[test]
fn test_config_validation_rejects_stats_log_interval_zero() {
    let bad = VALID_CONFIG.replace(
        "stats_log_interval_secs = 60",
        "stats_log_interval_secs = 0",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("stats_log_interval_secs"));
}

#[test]
fn test_config_rejects_unknown_metric() {
    let bad = FULL_CONFIG.replace(r#"["voltage", "current"]"#, r#"["humidity"]"#);
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.stream.device_ids.len(), 2);
}
