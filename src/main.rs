use anyhow::Result;
use solar_telemetry::*;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

/// Relay frames buffered between the stream reader and the dashboard worker.
const INBOUND_QUEUE_CAPACITY: usize = 256;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let selection = selection::SelectionState::new(
        app_config.stream.device_ids.clone(),
        app_config.stream.selected_device.as_deref(),
        &app_config.chart.default_metrics,
    );
    let engine = engine::TelemetryEngine::new(
        selection,
        app_config.window.capacity,
        app_config.chart.label_timezone,
    );

    let (frames_tx, _) =
        broadcast::channel::<projection::ChartUpdate>(app_config.publishing.broadcast_capacity);
    let (dashboard, command_rx) =
        worker::command_channel(app_config.publishing.command_queue_capacity);
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(INBOUND_QUEUE_CAPACITY);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            engine,
            inbound_rx,
            command_rx,
            frames_tx: frames_tx.clone(),
            shutdown_rx,
        },
        worker::WorkerConfig {
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
        },
    );

    // Connects in the background; the dashboard serves empty windows until the
    // relay answers.
    let stream_options = stream::StreamOptions::from_config(&app_config.stream);
    let connection = stream::StreamConnection::spawn(stream_options, inbound_tx);

    let app = routes::app(dashboard, frames_tx);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let mut serve_result = Ok(());
    tokio::select! {
        result = axum::serve(listener, app) => {
            serve_result = result;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
        }
    }

    connection.close().await;
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;

    serve_result?;
    Ok(())
}
