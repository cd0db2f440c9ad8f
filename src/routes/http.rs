// HTTP handlers: version, device/metric catalogs, selection controls, surface, chart

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::engine::EngineStats;
use crate::models::{DeviceWindow, Metric, MetricInfo};
use crate::projection::{Projection, SurfaceSize};
use crate::selection::{ChartStyle, SelectionState};
use crate::version::{NAME, VERSION};
use crate::worker::{DashboardError, SelectionAction};

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match self {
            DashboardError::Selection(_) => StatusCode::BAD_REQUEST,
            DashboardError::WorkerGone => StatusCode::SERVICE_UNAVAILABLE,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, DashboardError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DevicesResponse {
    devices: Vec<String>,
    active_device: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeviceRequest {
    device_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct MetricsRequest {
    metrics: Vec<Metric>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ToggleMetricRequest {
    metric: Metric,
}

/// Omitted field toggles the current value.
#[derive(Debug, Deserialize)]
pub(super) struct PauseRequest {
    #[serde(default)]
    paused: Option<bool>,
}

/// Omitted field toggles between line and area.
#[derive(Debug, Deserialize)]
pub(super) struct StyleRequest {
    #[serde(default)]
    style: Option<ChartStyle>,
}

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/devices: subscribed devices for the device selector.
pub(super) async fn devices_handler(State(state): State<AppState>) -> ApiResult<DevicesResponse> {
    let selection = state.dashboard.selection().await?;
    Ok(Json(DevicesResponse {
        devices: selection.subscribed_devices().to_vec(),
        active_device: selection.active_device().map(str::to_string),
    }))
}

/// GET /api/metrics: the static metric schema for the metric multi-selector.
pub(super) async fn metrics_handler() -> Json<Vec<MetricInfo>> {
    Json(Metric::ALL.into_iter().map(MetricInfo::from).collect())
}

pub(super) async fn stats_handler(State(state): State<AppState>) -> ApiResult<EngineStats> {
    Ok(Json(state.dashboard.stats().await?))
}

pub(super) async fn selection_handler(State(state): State<AppState>) -> ApiResult<SelectionState> {
    Ok(Json(state.dashboard.selection().await?))
}

pub(super) async fn set_device_handler(
    State(state): State<AppState>,
    Json(req): Json<DeviceRequest>,
) -> ApiResult<SelectionState> {
    let action = SelectionAction::Device(req.device_id);
    Ok(Json(state.dashboard.select(action).await?))
}

pub(super) async fn set_metrics_handler(
    State(state): State<AppState>,
    Json(req): Json<MetricsRequest>,
) -> ApiResult<SelectionState> {
    let action = SelectionAction::Metrics(req.metrics);
    Ok(Json(state.dashboard.select(action).await?))
}

pub(super) async fn toggle_metric_handler(
    State(state): State<AppState>,
    Json(req): Json<ToggleMetricRequest>,
) -> ApiResult<SelectionState> {
    let action = SelectionAction::ToggleMetric(req.metric);
    Ok(Json(state.dashboard.select(action).await?))
}

pub(super) async fn pause_handler(
    State(state): State<AppState>,
    Json(req): Json<PauseRequest>,
) -> ApiResult<SelectionState> {
    let action = match req.paused {
        Some(paused) => SelectionAction::Paused(paused),
        None => SelectionAction::TogglePaused,
    };
    Ok(Json(state.dashboard.select(action).await?))
}

pub(super) async fn style_handler(
    State(state): State<AppState>,
    Json(req): Json<StyleRequest>,
) -> ApiResult<SelectionState> {
    let action = match req.style {
        Some(style) => SelectionAction::Style(style),
        None => SelectionAction::ToggleStyle,
    };
    Ok(Json(state.dashboard.select(action).await?))
}

/// PUT /api/surface: chart surface reports its layout size; returns the new projection.
pub(super) async fn surface_handler(
    State(state): State<AppState>,
    Json(surface): Json<SurfaceSize>,
) -> ApiResult<Projection> {
    Ok(Json(state.dashboard.resize(surface).await?))
}

pub(super) async fn chart_handler(State(state): State<AppState>) -> ApiResult<Projection> {
    Ok(Json(state.dashboard.projection().await?))
}

/// GET /api/windows/{device_id}: aggregated window; empty for unknown devices.
pub(super) async fn window_handler(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> ApiResult<DeviceWindow> {
    Ok(Json(state.dashboard.window(&device_id).await?))
}
