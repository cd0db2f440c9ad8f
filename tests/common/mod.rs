// Shared test helpers

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use solar_telemetry::engine::TelemetryEngine;
use solar_telemetry::models::{BucketKey, CanonicalSample, Metric, MetricValues, RawSample};
use solar_telemetry::projection::LabelTimezone;
use solar_telemetry::selection::SelectionState;

/// 2025-06-01 at the given wall-clock time (UTC).
pub fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, h, m, s).unwrap() + chrono::Duration::milliseconds(ms as i64)
}

/// RFC 3339 string for `at(..)`, as the relay sends it.
pub fn at_str(h: u32, m: u32, s: u32, ms: u32) -> String {
    at(h, m, s, ms).to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn raw(v: Value) -> RawSample {
    v.as_object().cloned().expect("raw sample must be a JSON object")
}

pub fn voltage_sample(ts: DateTime<Utc>, voltage: f64) -> CanonicalSample {
    sample(ts, &[(Metric::Voltage, voltage)])
}

pub fn sample(ts: DateTime<Utc>, fields: &[(Metric, f64)]) -> CanonicalSample {
    CanonicalSample {
        bucket_key: BucketKey::from_timestamp(&ts),
        source_timestamp: ts,
        fields: fields.iter().copied().collect::<MetricValues>(),
    }
}

/// A `device_data` push with one batch per (device, samples) pair.
pub fn device_data(batches: &[(&str, Vec<Value>)]) -> String {
    let data: Vec<Value> = batches
        .iter()
        .map(|(id, samples)| json!({ "esp32_id": id, "data": samples }))
        .collect();
    json!({ "type": "device_data", "data": data }).to_string()
}

pub fn engine(devices: &[&str]) -> TelemetryEngine {
    let selection = SelectionState::new(
        devices.iter().map(|d| d.to_string()).collect(),
        None,
        &[Metric::Voltage],
    );
    TelemetryEngine::new(selection, 100, LabelTimezone::Utc)
}
