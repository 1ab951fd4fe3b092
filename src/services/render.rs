//! Render sink service
//!
//! This module separates presentation from batch orchestration, allowing
//! different frontends (UI cards, terminal bars, test recorders) to react to
//! per-item progress without the coordinator knowing how they draw.

use crate::error::ProcessingError;
use crate::types::{DownloadAffordance, ResultView};
use std::sync::{Mutex, PoisonError};

/// Receives per-item render notifications keyed by batch index
pub trait RenderSink: Send + Sync {
    /// Item `index` has started processing
    ///
    /// # Arguments
    /// * `index` - Position of the item in the batch
    /// * `file_name` - Source file name as submitted
    fn render_processing(&self, index: usize, file_name: &str);

    /// Item finished successfully and can be shown side by side
    fn render_result(&self, view: ResultView);

    /// Item failed; it will never receive a result
    fn render_failure(&self, index: usize, error: &ProcessingError) {
        // Default implementation does nothing - failures are already logged
        let _ = (index, error);
    }

    /// Trailing download action for the finished batch
    fn render_affordance(&self, affordance: DownloadAffordance) {
        let _ = affordance;
    }

    /// The batch was discarded and every card should disappear
    fn clear(&self) {}
}

/// No-op sink that discards all notifications
pub struct NoOpRenderSink;

impl RenderSink for NoOpRenderSink {
    fn render_processing(&self, _index: usize, _file_name: &str) {
        // Intentionally empty - discards processing notifications
    }

    fn render_result(&self, _view: ResultView) {
        // Intentionally empty - discards results
    }
}

/// Console sink that logs each notification
pub struct ConsoleRenderSink {
    verbose: bool,
}

impl ConsoleRenderSink {
    /// Create a new console sink
    ///
    /// # Arguments
    /// * `verbose` - Whether to include handles and dimensions
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl RenderSink for ConsoleRenderSink {
    fn render_processing(&self, index: usize, file_name: &str) {
        log::info!("[{}] Processing {}", index, file_name);
    }

    fn render_result(&self, view: ResultView) {
        if self.verbose {
            log::info!(
                "[{}] ✅ {} -> {} ({}x{}, preview {}, output {})",
                view.index,
                view.source_name,
                view.output_name,
                view.width,
                view.height,
                view.original_preview,
                view.output
            );
        } else {
            log::info!("[{}] ✅ {}", view.index, view.output_name);
        }
    }

    fn render_failure(&self, index: usize, error: &ProcessingError) {
        log::error!("[{}] ❌ {}", index, error);
    }

    fn render_affordance(&self, affordance: DownloadAffordance) {
        match affordance {
            DownloadAffordance::None => log::warn!("No images were cleaned"),
            DownloadAffordance::Single => log::info!("Result ready for download"),
            DownloadAffordance::Bulk => log::info!("Results ready for archive download"),
        }
    }
}

/// One notification captured by [`RecordingRenderSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Processing { index: usize, file_name: String },
    Result(ResultView),
    Failure { index: usize, error: ProcessingError },
    Affordance(DownloadAffordance),
    Cleared,
}

/// Sink that records every notification in order
#[derive(Default)]
pub struct RecordingRenderSink {
    events: Mutex<Vec<RenderEvent>>,
}

impl RecordingRenderSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: RenderEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Snapshot of everything recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded result views, in render order
    #[must_use]
    pub fn results(&self) -> Vec<ResultView> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RenderEvent::Result(view) => Some(view),
                _ => None,
            })
            .collect()
    }
}

impl RenderSink for RecordingRenderSink {
    fn render_processing(&self, index: usize, file_name: &str) {
        self.push(RenderEvent::Processing {
            index,
            file_name: file_name.to_string(),
        });
    }

    fn render_result(&self, view: ResultView) {
        self.push(RenderEvent::Result(view));
    }

    fn render_failure(&self, index: usize, error: &ProcessingError) {
        self.push(RenderEvent::Failure {
            index,
            error: error.clone(),
        });
    }

    fn render_affordance(&self, affordance: DownloadAffordance) {
        self.push(RenderEvent::Affordance(affordance));
    }

    fn clear(&self) {
        self.push(RenderEvent::Cleared);
    }
}
