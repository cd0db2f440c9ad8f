// Dashboard worker: owns the TelemetryEngine and drains relay frames and dashboard
// commands one at a time. Publishes a fresh projection after every change.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Duration, Instant, interval};

use crate::engine::{EngineStats, IngestOutcome, TelemetryEngine};
use crate::models::{DeviceWindow, Metric};
use crate::projection::{ChartUpdate, Projection, SurfaceSize};
use crate::selection::{ChartStyle, SelectionError, SelectionState};

/// Rate limit for "no receivers" message (avoid logging every batch when no chart is open)
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// One user action from the device selector, metric selector or toggles.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionAction {
    Device(String),
    Metrics(Vec<Metric>),
    ToggleMetric(Metric),
    Paused(bool),
    TogglePaused,
    Style(ChartStyle),
    ToggleStyle,
}

impl SelectionAction {
    fn apply(self, selection: &mut SelectionState) -> Result<(), SelectionError> {
        match self {
            SelectionAction::Device(id) => selection.set_active_device(&id),
            SelectionAction::Metrics(metrics) => selection.set_active_metrics(&metrics),
            SelectionAction::ToggleMetric(metric) => selection.toggle_metric(metric).map(|_| ()),
            SelectionAction::Paused(paused) => {
                selection.set_paused(paused);
                Ok(())
            }
            SelectionAction::TogglePaused => {
                selection.set_paused(!selection.paused());
                Ok(())
            }
            SelectionAction::Style(style) => {
                selection.set_chart_style(style);
                Ok(())
            }
            SelectionAction::ToggleStyle => {
                selection.set_chart_style(selection.chart_style().toggled());
                Ok(())
            }
        }
    }
}

pub enum Command {
    Select {
        action: SelectionAction,
        reply: oneshot::Sender<Result<SelectionState, SelectionError>>,
    },
    Resize {
        surface: SurfaceSize,
        reply: oneshot::Sender<Projection>,
    },
    Selection {
        reply: oneshot::Sender<SelectionState>,
    },
    Projection {
        reply: oneshot::Sender<Projection>,
    },
    ChartUpdate {
        reply: oneshot::Sender<ChartUpdate>,
    },
    Window {
        device_id: String,
        reply: oneshot::Sender<DeviceWindow>,
    },
    Stats {
        reply: oneshot::Sender<EngineStats>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("dashboard worker has stopped")]
    WorkerGone,
}

/// Cloneable front door to the worker, used by HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct DashboardHandle {
    tx: mpsc::Sender<Command>,
}

pub fn command_channel(capacity: usize) -> (DashboardHandle, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(capacity);
    (DashboardHandle { tx }, rx)
}

impl DashboardHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DashboardError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| DashboardError::WorkerGone)?;
        rx.await.map_err(|_| DashboardError::WorkerGone)
    }

    pub async fn select(&self, action: SelectionAction) -> Result<SelectionState, DashboardError> {
        Ok(self
            .request(|reply| Command::Select { action, reply })
            .await??)
    }

    pub async fn resize(&self, surface: SurfaceSize) -> Result<Projection, DashboardError> {
        self.request(|reply| Command::Resize { surface, reply })
            .await
    }

    pub async fn selection(&self) -> Result<SelectionState, DashboardError> {
        self.request(|reply| Command::Selection { reply }).await
    }

    pub async fn projection(&self) -> Result<Projection, DashboardError> {
        self.request(|reply| Command::Projection { reply }).await
    }

    /// Latest ungated frame, used by chart clients to start their stream.
    pub async fn chart_update(&self) -> Result<ChartUpdate, DashboardError> {
        self.request(|reply| Command::ChartUpdate { reply }).await
    }

    pub async fn window(&self, device_id: &str) -> Result<DeviceWindow, DashboardError> {
        let device_id = device_id.to_string();
        self.request(|reply| Command::Window { device_id, reply })
            .await
    }

    pub async fn stats(&self) -> Result<EngineStats, DashboardError> {
        self.request(|reply| Command::Stats { reply }).await
    }
}

/// Engine, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub engine: TelemetryEngine,
    pub inbound_rx: mpsc::Receiver<String>,
    pub command_rx: mpsc::Receiver<Command>,
    pub frames_tx: broadcast::Sender<ChartUpdate>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    /// How often to log engine stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Runs until shutdown or until every DashboardHandle is dropped. A closed inbound
/// channel (stream gone) leaves the dashboard serving its last windows.
pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        mut engine,
        mut inbound_rx,
        mut command_rx,
        frames_tx,
        mut shutdown_rx,
    } = deps;

    tokio::spawn(async move {
        let mut stats_log_tick = interval(Duration::from_secs(config.stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut inbound_open = true;
        let mut last_no_receivers_log: Option<Instant> = None;

        let mut publish = |engine: &TelemetryEngine| {
            if frames_tx.send(engine.chart_update()).is_err() {
                let should_log = last_no_receivers_log
                    .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL);
                if should_log {
                    tracing::debug!(
                        operation = "publish_projection",
                        "No chart clients; broadcast channel has no receivers"
                    );
                    last_no_receivers_log = Some(Instant::now());
                }
            }
        };

        loop {
            tokio::select! {
                frame = inbound_rx.recv(), if inbound_open => {
                    match frame {
                        Some(text) => {
                            if let IngestOutcome::Aggregated(_) = engine.handle_message(&text) {
                                publish(&engine);
                            }
                        }
                        None => {
                            tracing::info!("telemetry stream ended; serving last known windows");
                            inbound_open = false;
                        }
                    }
                }
                command = command_rx.recv() => {
                    let Some(command) = command else { break };
                    if handle_command(&mut engine, command) {
                        publish(&engine);
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Dashboard worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    let stats = engine.stats();
                    tracing::info!(
                        messages_received = stats.messages_received,
                        batches_aggregated = stats.batches_aggregated,
                        skipped_while_paused = stats.skipped_while_paused,
                        malformed_messages = stats.malformed_messages,
                        devices_reporting = engine.store().device_ids().count(),
                        points_held = engine.store().total_points(),
                        "engine stats"
                    );
                }
            }
        }
    })
}

/// Applies one command. Returns true when the projection may have changed.
fn handle_command(engine: &mut TelemetryEngine, command: Command) -> bool {
    match command {
        Command::Select { action, reply } => {
            let result = action.apply(engine.selection_mut());
            let changed = result.is_ok();
            if let Err(e) = &result {
                tracing::debug!(error = %e, "selection rejected");
            }
            let _ = reply.send(result.map(|_| engine.selection().clone()));
            changed
        }
        Command::Resize { surface, reply } => {
            engine.set_surface(surface);
            let _ = reply.send(engine.project());
            true
        }
        Command::Selection { reply } => {
            let _ = reply.send(engine.selection().clone());
            false
        }
        Command::Projection { reply } => {
            let _ = reply.send(engine.project());
            false
        }
        Command::ChartUpdate { reply } => {
            let _ = reply.send(engine.chart_update());
            false
        }
        Command::Window { device_id, reply } => {
            let _ = reply.send(engine.window(&device_id).to_vec());
            false
        }
        Command::Stats { reply } => {
            let _ = reply.send(engine.stats());
            false
        }
    }
}
