// Bucket aggregation: merge a device window with a new batch, collapse same-second
// samples by per-metric mean, keep the newest `capacity` points.
// The whole window is re-derived on every batch so out-of-order and overlapping
// pushes land in the right bucket.

use std::collections::HashMap;

use crate::models::{AggregatedPoint, BucketKey, CanonicalSample, DeviceWindow, MetricValues};

/// Points retained per device.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Merges `existing` with `incoming` and returns the replacement window.
/// Existing points act as single contributors to their bucket.
pub fn merge_window(
    existing: &[AggregatedPoint],
    incoming: Vec<CanonicalSample>,
    capacity: usize,
) -> DeviceWindow {
    let mut combined: Vec<CanonicalSample> = existing
        .iter()
        .cloned()
        .map(CanonicalSample::from)
        .chain(incoming)
        .collect();
    // Stable: equal timestamps keep arrival order.
    combined.sort_by_key(|s| s.source_timestamp);

    let mut key_order: Vec<&BucketKey> = Vec::new();
    let mut groups: HashMap<&BucketKey, Vec<&CanonicalSample>> = HashMap::new();
    for s in &combined {
        let members = groups.entry(&s.bucket_key).or_default();
        if members.is_empty() {
            key_order.push(&s.bucket_key);
        }
        members.push(s);
    }

    let mut points: Vec<AggregatedPoint> = key_order
        .into_iter()
        .filter_map(|key| aggregate_bucket(groups.get(key)?))
        .collect();
    points.sort_by_key(|p| p.representative_timestamp);

    if points.len() > capacity {
        points.drain(..points.len() - capacity);
    }
    points
}

/// Aggregates one bucket. The first member is the representative: it supplies the
/// timestamp and the metric set. Members missing a metric sit out that metric's mean.
pub fn aggregate_bucket(members: &[&CanonicalSample]) -> Option<AggregatedPoint> {
    let representative = members.first()?;
    let fields: MetricValues = representative
        .fields
        .keys()
        .map(|metric| {
            let values: Vec<f64> = members
                .iter()
                .filter_map(|m| m.fields.get(metric).copied())
                .collect();
            (*metric, mean_f64(&values))
        })
        .collect();

    Some(AggregatedPoint {
        bucket_key: representative.bucket_key.clone(),
        representative_timestamp: representative.source_timestamp,
        fields,
    })
}

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}
