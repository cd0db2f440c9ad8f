// Raw relay records -> canonical samples keyed by second-resolution bucket.
// Fields are checked against the static metric schema here; the aggregator only sees
// known metrics with finite numeric values.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{BucketKey, CanonicalSample, Metric, MetricValues, RawSample};

/// Timestamp aliases in precedence order.
pub const TIMESTAMP_ALIASES: [&str; 2] = ["created_at", "timestamp"];

/// Bookkeeping fields the relay or firmware attach; dropped without logging.
const IGNORED_FIELDS: [&str; 4] = ["esp32_unique_id", "esp32_id", "id", "time"];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Normalizes one device's batch, preserving input order. Samples without a usable
/// timestamp are logged and skipped.
pub fn normalize_batch(device_id: &str, raw: &[RawSample]) -> Vec<CanonicalSample> {
    let mut out = Vec::with_capacity(raw.len());
    for sample in raw {
        match normalize_sample(sample) {
            Some(s) => out.push(s),
            None => warn!(
                device_id = %device_id,
                operation = "normalize_sample",
                "sample has no parseable timestamp; dropped"
            ),
        }
    }
    out
}

pub fn normalize_sample(raw: &RawSample) -> Option<CanonicalSample> {
    let source_timestamp = resolve_timestamp(raw)?;
    let mut fields = MetricValues::new();
    for (name, value) in raw {
        if TIMESTAMP_ALIASES.contains(&name.as_str()) || IGNORED_FIELDS.contains(&name.as_str())
        {
            continue;
        }
        let Some(metric) = Metric::from_field(name) else {
            debug!(field = %name, "unknown telemetry field; dropped");
            continue;
        };
        match coerce_f64(value) {
            Some(v) => {
                fields.insert(metric, v);
            }
            None => debug!(field = %name, value = %value, "non-numeric telemetry value; dropped"),
        }
    }
    Some(CanonicalSample {
        bucket_key: BucketKey::from_timestamp(&source_timestamp),
        source_timestamp,
        fields,
    })
}

/// `created_at` wins when present and non-empty; otherwise `timestamp`.
fn resolve_timestamp(raw: &RawSample) -> Option<DateTime<Utc>> {
    let value = TIMESTAMP_ALIASES
        .iter()
        .filter_map(|alias| raw.get(*alias))
        .find(|v| !v.is_null() && v.as_str() != Some(""))?;
    parse_timestamp(value)
}

/// Accepts RFC 3339 strings, naive ISO strings (taken as UTC) and epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}
