// User-controlled view parameters. Mutated only by explicit dashboard actions, never by
// the ingestion path.

use serde::{Deserialize, Serialize};

use crate::models::Metric;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartStyle {
    #[default]
    Line,
    Area,
}

impl ChartStyle {
    pub fn toggled(self) -> Self {
        match self {
            ChartStyle::Line => ChartStyle::Area,
            ChartStyle::Area => ChartStyle::Line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("device {0} is not subscribed")]
    UnknownDevice(String),
    #[error("at least one metric must stay selected")]
    NoMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    #[serde(skip)]
    subscribed: Vec<String>,
    active_device: Option<String>,
    /// Insertion order is display and color order.
    active_metrics: Vec<Metric>,
    paused: bool,
    chart_style: ChartStyle,
}

impl SelectionState {
    /// Starts on `preferred` when it is subscribed, else on the first subscribed device.
    /// An empty `metrics` list falls back to solar panel temperature.
    pub fn new(subscribed: Vec<String>, preferred: Option<&str>, metrics: &[Metric]) -> Self {
        let active_device = preferred
            .filter(|p| subscribed.iter().any(|id| id == p))
            .map(str::to_string)
            .or_else(|| subscribed.first().cloned());
        let active_metrics = match dedup(metrics) {
            m if m.is_empty() => vec![Metric::SolarPanelTemp],
            m => m,
        };
        Self {
            subscribed,
            active_device,
            active_metrics,
            paused: false,
            chart_style: ChartStyle::default(),
        }
    }

    pub fn subscribed_devices(&self) -> &[String] {
        &self.subscribed
    }

    pub fn active_device(&self) -> Option<&str> {
        self.active_device.as_deref()
    }

    pub fn set_active_device(&mut self, device_id: &str) -> Result<(), SelectionError> {
        if !self.subscribed.iter().any(|id| id == device_id) {
            return Err(SelectionError::UnknownDevice(device_id.to_string()));
        }
        self.active_device = Some(device_id.to_string());
        Ok(())
    }

    pub fn active_metrics(&self) -> &[Metric] {
        &self.active_metrics
    }

    /// Replaces the metric set; duplicates keep their first position.
    pub fn set_active_metrics(&mut self, metrics: &[Metric]) -> Result<(), SelectionError> {
        let metrics = dedup(metrics);
        if metrics.is_empty() {
            return Err(SelectionError::NoMetrics);
        }
        self.active_metrics = metrics;
        Ok(())
    }

    /// Adds `metric` at the end or removes it. Returns whether it is now selected.
    pub fn toggle_metric(&mut self, metric: Metric) -> Result<bool, SelectionError> {
        match self.active_metrics.iter().position(|m| *m == metric) {
            Some(_) if self.active_metrics.len() == 1 => Err(SelectionError::NoMetrics),
            Some(idx) => {
                self.active_metrics.remove(idx);
                Ok(false)
            }
            None => {
                self.active_metrics.push(metric);
                Ok(true)
            }
        }
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn chart_style(&self) -> ChartStyle {
        self.chart_style
    }

    pub fn set_chart_style(&mut self, style: ChartStyle) {
        self.chart_style = style;
    }
}

fn dedup(metrics: &[Metric]) -> Vec<Metric> {
    let mut out: Vec<Metric> = Vec::with_capacity(metrics.len());
    for m in metrics {
        if !out.contains(m) {
            out.push(*m);
        }
    }
    out
}
