// WebSocket chart stream: current projection on connect, then one frame per change.
// Each client gates frames with the surface size it reported itself.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, interval_at, timeout};

use super::AppState;
use crate::projection::{ChartUpdate, Projection, SurfaceSize};
use crate::worker::DashboardHandle;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Messages the chart surface may send on /ws/chart.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SurfaceMessage {
    Resize { width: u32, height: u32 },
}

pub(super) async fn ws_chart(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let tx = state.frames_tx.clone();
    let dashboard = state.dashboard.clone();
    ws.on_upgrade(move |socket| async move {
        let mut rx = tx.subscribe();
        if let Err(e) = stream_chart(socket, &mut rx, dashboard).await {
            tracing::info!("Chart stream error: {}", e);
        }
    })
}

async fn send_frame(socket: &mut WebSocket, frame: &Projection) -> anyhow::Result<bool> {
    let json = serde_json::to_string(frame)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

async fn stream_chart(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<ChartUpdate>,
    dashboard: DashboardHandle,
) -> anyhow::Result<()> {
    tracing::info!("Client connected to chart stream");

    let mut latest = dashboard.chart_update().await?;
    let mut surface: Option<SurfaceSize> = None;
    if !send_frame(&mut socket, &latest.projection_for(surface)).await? {
        return Ok(());
    }

    // First ping one interval after connect, not immediately.
    let mut ping_interval = interval_at(Instant::now() + WS_PING_INTERVAL, WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(update) => {
                        latest = update;
                        if !send_frame(&mut socket, &latest.projection_for(surface)).await? {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/chart client lagged, skipped {} frames", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<SurfaceMessage>(text.as_str()) {
                            Ok(SurfaceMessage::Resize { width, height }) => {
                                surface = Some(SurfaceSize::new(width, height));
                                if !send_frame(&mut socket, &latest.projection_for(surface)).await? {
                                    break;
                                }
                            }
                            Err(e) => tracing::debug!(error = %e, "ignoring chart client message"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}
