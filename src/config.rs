use serde::Deserialize;

use crate::aggregation::DEFAULT_WINDOW_CAPACITY;
use crate::models::Metric;
use crate::projection::LabelTimezone;

const MAX_WINDOW_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub stream: StreamConfig,
    #[serde(default)]
    pub window: WindowConfig,
    pub server: ServerConfig,
    pub publishing: PublishingConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Relay endpoint, e.g. "ws://localhost:8080/ws".
    pub url: String,
    /// Devices subscribed in the initial request_data message.
    pub device_ids: Vec<String>,
    /// Device shown first; falls back to the first subscribed device.
    #[serde(default)]
    pub selected_device: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Bounded exponential backoff after the relay connection drops.
/// `enabled = false` leaves the chart frozen after a drop.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_reconnect_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_reconnect_enabled() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconnect_enabled(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of chart frames kept in the broadcast channel for /ws/chart (slow clients may lag).
    pub broadcast_capacity: usize,
    /// Pending dashboard commands before HTTP handlers wait on the worker.
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
}

fn default_command_queue_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log engine stats (messages, batches, skipped) at INFO level.
    pub stats_log_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub label_timezone: LabelTimezone,
    #[serde(default = "default_metrics")]
    pub default_metrics: Vec<Metric>,
}

fn default_metrics() -> Vec<Metric> {
    vec![Metric::SolarPanelTemp]
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            label_timezone: LabelTimezone::default(),
            default_metrics: default_metrics(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.stream.url.starts_with("ws://") || self.stream.url.starts_with("wss://"),
            "stream.url must be a ws:// or wss:// URL, got {}",
            self.stream.url
        );
        anyhow::ensure!(
            !self.stream.device_ids.is_empty(),
            "stream.device_ids must be non-empty"
        );
        anyhow::ensure!(
            self.stream.device_ids.iter().all(|id| !id.is_empty()),
            "stream.device_ids must not contain empty ids"
        );
        if let Some(selected) = &self.stream.selected_device {
            anyhow::ensure!(
                self.stream.device_ids.contains(selected),
                "stream.selected_device {} is not in stream.device_ids",
                selected
            );
        }
        anyhow::ensure!(
            self.stream.connect_timeout_ms > 0,
            "stream.connect_timeout_ms must be > 0, got {}",
            self.stream.connect_timeout_ms
        );
        if self.stream.reconnect.enabled {
            anyhow::ensure!(
                self.stream.reconnect.max_attempts > 0,
                "stream.reconnect.max_attempts must be > 0 when reconnect is enabled"
            );
            anyhow::ensure!(
                self.stream.reconnect.initial_backoff_ms > 0,
                "stream.reconnect.initial_backoff_ms must be > 0, got {}",
                self.stream.reconnect.initial_backoff_ms
            );
            anyhow::ensure!(
                self.stream.reconnect.max_backoff_ms >= self.stream.reconnect.initial_backoff_ms,
                "stream.reconnect.max_backoff_ms must be >= initial_backoff_ms, got {}",
                self.stream.reconnect.max_backoff_ms
            );
        }
        anyhow::ensure!(
            (1..=MAX_WINDOW_CAPACITY).contains(&self.window.capacity),
            "window.capacity must be between 1 and {}, got {}",
            MAX_WINDOW_CAPACITY,
            self.window.capacity
        );
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(
            self.publishing.command_queue_capacity > 0,
            "publishing.command_queue_capacity must be > 0, got {}",
            self.publishing.command_queue_capacity
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            !self.chart.default_metrics.is_empty(),
            "chart.default_metrics must be non-empty"
        );
        Ok(())
    }
}
