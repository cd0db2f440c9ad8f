// Per-device rolling windows. The store never trims; the aggregator hands it
// windows that already respect the cap.

use std::collections::HashMap;

use crate::models::{AggregatedPoint, DeviceWindow};

#[derive(Debug, Default, Clone)]
pub struct WindowStore {
    windows: HashMap<String, DeviceWindow>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Window for `device_id`; empty when the device has not reported yet.
    pub fn get(&self, device_id: &str) -> &[AggregatedPoint] {
        self.windows
            .get(device_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn replace(&mut self, device_id: &str, window: DeviceWindow) {
        self.windows.insert(device_id.to_string(), window);
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(String::as_str)
    }

    pub fn total_points(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }
}
