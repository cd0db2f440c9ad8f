// Static telemetry schema: every metric a solar tracker reports.

use serde::{Deserialize, Serialize};

/// Known telemetry field. Serializes to the dashboard key (e.g. "solar_panel_temp").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MaxElevation,
    MinElevation,
    ServoTowerAngle,
    SolarPanelTemp,
    Esp32CoreTemp,
    Voltage,
    Current,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::MaxElevation,
        Metric::MinElevation,
        Metric::ServoTowerAngle,
        Metric::SolarPanelTemp,
        Metric::Esp32CoreTemp,
        Metric::Voltage,
        Metric::Current,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::MaxElevation => "max_elevation",
            Metric::MinElevation => "min_elevation",
            Metric::ServoTowerAngle => "servo_tower_angle",
            Metric::SolarPanelTemp => "solar_panel_temp",
            Metric::Esp32CoreTemp => "esp32_core_temp",
            Metric::Voltage => "voltage",
            Metric::Current => "current",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::MaxElevation => "Max Elevation",
            Metric::MinElevation => "Min Elevation",
            Metric::ServoTowerAngle => "Servo Tower Angle",
            Metric::SolarPanelTemp => "Solar Panel Temp",
            Metric::Esp32CoreTemp => "ESP32 Core Temp",
            Metric::Voltage => "Voltage",
            Metric::Current => "Current",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::MaxElevation | Metric::MinElevation | Metric::ServoTowerAngle => "deg",
            Metric::SolarPanelTemp | Metric::Esp32CoreTemp => "°C",
            Metric::Voltage => "V",
            Metric::Current => "A",
        }
    }

    /// Resolve a raw field name, accepting the firmware's long temperature names.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "solar_panel_temperature" => Some(Metric::SolarPanelTemp),
            "esp32_core_temperature" => Some(Metric::Esp32CoreTemp),
            other => Metric::ALL.into_iter().find(|m| m.key() == other),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::from_field(s).ok_or_else(|| format!("unknown metric: {}", s))
    }
}

/// Metric descriptor for the dashboard's multi-selector (GET /api/metrics).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricInfo {
    pub key: Metric,
    pub label: String,
    pub unit: String,
}

impl From<Metric> for MetricInfo {
    fn from(m: Metric) -> Self {
        Self {
            key: m,
            label: m.label().to_string(),
            unit: m.unit().to_string(),
        }
    }
}
