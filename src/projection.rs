// Render projection: (device window x selection) -> chart-ready coordinates.
// Withheld while the chart surface has zero area.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AggregatedPoint, Metric};
use crate::selection::{ChartStyle, SelectionState};

/// Series colors, assigned cyclically by position in the active metric set.
pub const PALETTE: [&str; 4] = ["#1976d2", "#ff5722", "#388e3c", "#ff9800"];

const LABEL_FORMAT: &str = "%H:%M:%S";

pub fn series_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Layout size last reported by the chart surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_drawable(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Timezone used for x-axis labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelTimezone {
    #[default]
    Utc,
    Local,
}

impl LabelTimezone {
    pub fn format(self, ts: &DateTime<Utc>) -> String {
        match self {
            LabelTimezone::Utc => ts.format(LABEL_FORMAT).to_string(),
            LabelTimezone::Local => ts.with_timezone(&Local).format(LABEL_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub metric: Metric,
    pub label: String,
    pub color: String,
}

/// One x position; `y[i]` belongs to `series[i]`. `None` when the point lacks the metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: String,
    pub y: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartFrame {
    pub device_id: Option<String>,
    pub style: ChartStyle,
    pub paused: bool,
    pub series: Vec<SeriesSpec>,
    pub points: Vec<ChartPoint>,
}

impl ChartFrame {
    /// No points: the surface shows its empty state.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Projection {
    /// Surface has not reported a nonzero size yet; show a placeholder.
    AwaitingLayout,
    Chart(ChartFrame),
}

impl Projection {
    pub fn frame(&self) -> Option<&ChartFrame> {
        match self {
            Projection::Chart(frame) => Some(frame),
            Projection::AwaitingLayout => None,
        }
    }

    /// Withholds `frame` until `surface` has a nonzero area.
    pub fn gate(frame: ChartFrame, surface: SurfaceSize) -> Self {
        if surface.is_drawable() {
            Projection::Chart(frame)
        } else {
            Projection::AwaitingLayout
        }
    }
}

/// Published after every change. Each chart client gates the frame with its own
/// surface size; `default_surface` applies until the client reports one.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartUpdate {
    pub frame: ChartFrame,
    pub default_surface: SurfaceSize,
}

impl ChartUpdate {
    pub fn projection_for(&self, surface: Option<SurfaceSize>) -> Projection {
        Projection::gate(self.frame.clone(), surface.unwrap_or(self.default_surface))
    }
}

pub fn project(
    window: &[AggregatedPoint],
    selection: &SelectionState,
    surface: SurfaceSize,
    tz: LabelTimezone,
) -> Projection {
    if !surface.is_drawable() {
        return Projection::AwaitingLayout;
    }
    Projection::Chart(chart_frame(window, selection, tz))
}

/// Series and points for the active device, regardless of surface size.
pub fn chart_frame(
    window: &[AggregatedPoint],
    selection: &SelectionState,
    tz: LabelTimezone,
) -> ChartFrame {
    let metrics = selection.active_metrics();
    let series = metrics
        .iter()
        .enumerate()
        .map(|(i, m)| SeriesSpec {
            metric: *m,
            label: m.label().to_string(),
            color: series_color(i).to_string(),
        })
        .collect();
    let points = window
        .iter()
        .map(|p| ChartPoint {
            x: tz.format(&p.representative_timestamp),
            y: metrics.iter().map(|m| p.fields.get(m).copied()).collect(),
        })
        .collect();
    ChartFrame {
        device_id: selection.active_device().map(str::to_string),
        style: selection.chart_style(),
        paused: selection.paused(),
        series,
        points,
    }
}
