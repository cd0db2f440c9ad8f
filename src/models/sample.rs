// Sample shapes along the ingestion path: raw -> canonical -> aggregated.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Metric;

/// One raw record as pushed by the relay. Field set is not fixed.
pub type RawSample = serde_json::Map<String, serde_json::Value>;

/// Bounded, ascending history of aggregated points for one device.
pub type DeviceWindow = Vec<AggregatedPoint>;

/// Per-metric values carried by a sample or an aggregated point.
pub type MetricValues = BTreeMap<Metric, f64>;

const BUCKET_KEY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Second-resolution quantization of a timestamp (UTC). Sub-second timing is discarded,
/// so two samples in the same wall-clock second share a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn from_timestamp(ts: &DateTime<Utc>) -> Self {
        Self(ts.format(BUCKET_KEY_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSample {
    pub bucket_key: BucketKey,
    pub source_timestamp: DateTime<Utc>,
    pub fields: MetricValues,
}

/// One bucket's merged result: per-metric mean of every contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPoint {
    pub bucket_key: BucketKey,
    /// Timestamp of the bucket's first contributing sample.
    pub representative_timestamp: DateTime<Utc>,
    pub fields: MetricValues,
}

impl From<AggregatedPoint> for CanonicalSample {
    fn from(p: AggregatedPoint) -> Self {
        Self {
            bucket_key: p.bucket_key,
            source_timestamp: p.representative_timestamp,
            fields: p.fields,
        }
    }
}
