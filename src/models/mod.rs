// Domain models: metric schema, sample shapes, relay wire messages

mod message;
mod metric;
mod sample;

pub use message::{ClientMessage, DeviceBatch, ServerMessage};
pub use metric::{Metric, MetricInfo};
pub use sample::{
    AggregatedPoint, BucketKey, CanonicalSample, DeviceWindow, MetricValues, RawSample,
};
