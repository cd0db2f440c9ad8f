// HTTP + WebSocket routes for the chart surface and its controls

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::projection::ChartUpdate;
use crate::worker::DashboardHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dashboard: DashboardHandle,
    pub(crate) frames_tx: broadcast::Sender<ChartUpdate>,
}

pub fn app(dashboard: DashboardHandle, frames_tx: broadcast::Sender<ChartUpdate>) -> Router {
    let state = AppState {
        dashboard,
        frames_tx,
    };
    Router::new()
        .route("/", get(|| async { "Solar tracker telemetry dashboard" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/devices", get(http::devices_handler)) // GET /api/devices
        .route("/api/metrics", get(http::metrics_handler)) // GET /api/metrics
        .route("/api/stats", get(http::stats_handler)) // GET /api/stats
        .route("/api/selection", get(http::selection_handler)) // GET /api/selection
        .route("/api/selection/device", put(http::set_device_handler)) // PUT /api/selection/device
        .route("/api/selection/metrics", put(http::set_metrics_handler)) // PUT /api/selection/metrics
        .route(
            "/api/selection/metrics/toggle",
            post(http::toggle_metric_handler),
        ) // POST /api/selection/metrics/toggle
        .route("/api/selection/pause", post(http::pause_handler)) // POST /api/selection/pause
        .route("/api/selection/style", post(http::style_handler)) // POST /api/selection/style
        .route("/api/surface", put(http::surface_handler)) // PUT /api/surface
        .route("/api/chart", get(http::chart_handler)) // GET /api/chart
        .route("/api/windows/{device_id}", get(http::window_handler)) // GET /api/windows/{device_id}
        .route("/ws/chart", get(ws::ws_chart)) // WS /ws/chart
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
