// Telemetry engine: the single owner of windows, selection and surface size.
// Every inbound message and every user action goes through one `&mut self` method,
// so a message is either fully aggregated or fully skipped.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::aggregation::merge_window;
use crate::models::{AggregatedPoint, DeviceBatch, ServerMessage};
use crate::normalizer::normalize_batch;
use crate::projection::{
    ChartUpdate, LabelTimezone, Projection, SurfaceSize, chart_frame, project,
};
use crate::selection::SelectionState;
use crate::window_store::WindowStore;

/// Counters reported by the worker's periodic stats log and GET /api/stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub messages_received: u64,
    pub batches_aggregated: u64,
    pub skipped_while_paused: u64,
    pub malformed_messages: u64,
    pub ignored_messages: u64,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Windows for this many devices were re-derived.
    Aggregated(usize),
    Paused,
    Ignored,
    Malformed,
}

pub struct TelemetryEngine {
    store: WindowStore,
    selection: SelectionState,
    surface: SurfaceSize,
    capacity: usize,
    label_tz: LabelTimezone,
    stats: EngineStats,
}

impl TelemetryEngine {
    pub fn new(selection: SelectionState, capacity: usize, label_tz: LabelTimezone) -> Self {
        Self {
            store: WindowStore::new(),
            selection,
            surface: SurfaceSize::default(),
            capacity,
            label_tz,
            stats: EngineStats::default(),
        }
    }

    /// Handles one text frame from the relay. While paused the frame is counted and
    /// dropped before parsing; stored windows stay as they are.
    #[instrument(skip_all, fields(operation = "handle_message"))]
    pub fn handle_message(&mut self, text: &str) -> IngestOutcome {
        self.stats.messages_received += 1;
        if self.selection.paused() {
            self.stats.skipped_while_paused += 1;
            return IngestOutcome::Paused;
        }
        match ServerMessage::parse(text) {
            Ok(ServerMessage::DeviceData(batches)) => {
                IngestOutcome::Aggregated(self.ingest(&batches))
            }
            Ok(ServerMessage::Status { status, message }) => {
                if status == "error" {
                    warn!(status = %status, message = %message, "relay reported an error");
                } else {
                    debug!(status = %status, message = %message, "relay status");
                }
                self.stats.ignored_messages += 1;
                IngestOutcome::Ignored
            }
            Ok(ServerMessage::Other(kind)) => {
                debug!(message_type = %kind, "ignoring message");
                self.stats.ignored_messages += 1;
                IngestOutcome::Ignored
            }
            Err(e) => {
                warn!(error = %e, "malformed message discarded");
                self.stats.malformed_messages += 1;
                IngestOutcome::Malformed
            }
        }
    }

    /// Normalizes and merges each device batch, replacing that device's window.
    /// Returns the number of devices updated.
    pub fn ingest(&mut self, batches: &[DeviceBatch]) -> usize {
        for batch in batches {
            let samples = normalize_batch(&batch.esp32_id, batch.samples());
            let window = merge_window(self.store.get(&batch.esp32_id), samples, self.capacity);
            debug!(
                device_id = %batch.esp32_id,
                points = window.len(),
                "window updated"
            );
            self.store.replace(&batch.esp32_id, window);
            self.stats.batches_aggregated += 1;
        }
        batches.len()
    }

    pub fn window(&self, device_id: &str) -> &[AggregatedPoint] {
        self.store.get(device_id)
    }

    pub fn store(&self) -> &WindowStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Selection edits never touch stored windows.
    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    /// Surface used by HTTP callers and by chart clients that have not reported a size.
    pub fn set_surface(&mut self, surface: SurfaceSize) {
        self.surface = surface;
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn project(&self) -> Projection {
        project(self.active_window(), &self.selection, self.surface, self.label_tz)
    }

    /// Ungated frame plus the shared surface, for per-client gating.
    pub fn chart_update(&self) -> ChartUpdate {
        ChartUpdate {
            frame: chart_frame(self.active_window(), &self.selection, self.label_tz),
            default_surface: self.surface,
        }
    }

    fn active_window(&self) -> &[AggregatedPoint] {
        self.selection
            .active_device()
            .map(|id| self.store.get(id))
            .unwrap_or_default()
    }
}
