//! Batch coordination
//!
//! [`BatchCoordinator`] owns the current batch, feeds its files through the
//! [`ItemProcessor`] strictly one after another in input order, registers
//! every produced resource with the [`ResourceLedger`] and decides which
//! download action the finished batch offers.

use crate::{
    error::{PipelineError, Result},
    ledger::ResourceLedger,
    processor::ItemProcessor,
    services::RenderSink,
    tracing_config::{events, spans},
    types::{
        BatchSummary, CompletedOutput, DownloadAffordance, FileCandidate, ItemState,
        ProcessedOutput, ProcessingItem, ResultView,
    },
};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Files submitted together
#[derive(Debug)]
struct Batch {
    id: Uuid,
    items: Vec<ProcessingItem>,
    started: Instant,
    affordance: DownloadAffordance,
}

/// Sequences item processing and owns the batch state
pub struct BatchCoordinator {
    processor: ItemProcessor,
    ledger: ResourceLedger,
    sink: Arc<dyn RenderSink>,
    batch: Option<Batch>,
}

impl BatchCoordinator {
    pub fn new(processor: ItemProcessor, ledger: ResourceLedger, sink: Arc<dyn RenderSink>) -> Self {
        Self {
            processor,
            ledger,
            sink,
            batch: None,
        }
    }

    /// Accept a new set of files and process them in order
    ///
    /// Files whose declared media type is not an image are dropped. If
    /// nothing is left, `NoValidFiles` is returned and the current batch is
    /// kept as it was. Otherwise the current batch is discarded (its handles
    /// released) and replaced by the new one.
    pub async fn submit(&mut self, files: Vec<FileCandidate>) -> Result<BatchSummary> {
        let offered = files.len();
        let accepted: Vec<FileCandidate> = files
            .into_iter()
            .filter(|file| {
                let keep = file.is_image();
                if !keep {
                    debug!(file_name = %file.name, media_type = %file.media_type, "Skipping non-image file");
                }
                keep
            })
            .collect();

        if accepted.is_empty() {
            warn!(offered, "Submission contained no image files");
            return Err(PipelineError::NoValidFiles);
        }

        self.reset();

        let id = Uuid::new_v4();
        let items = accepted
            .iter()
            .enumerate()
            .map(|(index, file)| ProcessingItem::queued(index, file.name.clone()))
            .collect();
        self.batch = Some(Batch {
            id,
            items,
            started: Instant::now(),
            affordance: DownloadAffordance::None,
        });

        let span = spans::batch_processing(id, accepted.len());
        self.run_batch(&accepted).instrument(span).await;

        self.finish_batch()
    }

    async fn run_batch(&mut self, files: &[FileCandidate]) {
        info!(file_count = files.len(), engine = %self.processor.engine().name(), "Starting batch");

        for (index, file) in files.iter().enumerate() {
            self.sink.render_processing(index, &file.name);
            self.set_state(index, ItemState::Processing);

            match self.processor.run(file).await {
                Ok(output) => self.complete_item(index, &file.name, output),
                Err(failure) => {
                    events::error_with_context(&failure, &format!("item {}", index));
                    self.set_state(index, ItemState::Failed(failure.cause.clone()));
                    self.sink.render_failure(index, &failure);
                },
            }
        }
    }

    fn complete_item(&mut self, index: usize, source_name: &str, output: ProcessedOutput) {
        let preview: Arc<[u8]> = Arc::from(output.original_preview);
        let output_blob: Arc<[u8]> = Arc::from(output.output_bytes);

        // Handles are minted only once the output blob exists
        let preview_handle = self.ledger.allocate(preview);
        let download_handle = self.ledger.allocate(Arc::clone(&output_blob));
        let output_name = self.processor.output_name(source_name);

        let view = ResultView {
            index,
            source_name: source_name.to_string(),
            output_name: output_name.clone(),
            original_preview: preview_handle.clone(),
            output: download_handle.clone(),
            width: output.width,
            height: output.height,
        };

        if let Some(item) = self.item_mut(index) {
            item.original_preview_handle = Some(preview_handle);
            item.state = ItemState::Completed(CompletedOutput {
                output_name,
                output_blob,
                download_handle,
                width: output.width,
                height: output.height,
            });
        }

        self.sink.render_result(view);
    }

    fn finish_batch(&mut self) -> Result<BatchSummary> {
        let batch = self
            .batch
            .as_mut()
            .ok_or_else(|| PipelineError::internal("Batch vanished while processing"))?;

        let total = batch.items.len();
        let completed = batch.items.iter().filter(|item| item.is_completed()).count();
        let failed = total - completed;
        let affordance = DownloadAffordance::from_completed(completed);
        batch.affordance = affordance;

        let summary = BatchSummary {
            batch_id: batch.id,
            total,
            completed,
            failed,
            affordance,
            elapsed_ms: batch.started.elapsed().as_millis() as u64,
        };

        info!(
            batch_id = %summary.batch_id,
            total,
            completed,
            failed,
            affordance = ?affordance,
            elapsed_ms = summary.elapsed_ms,
            "Batch finished"
        );
        self.sink.render_affordance(affordance);
        Ok(summary)
    }

    /// Discard the current batch and release every handle it owns
    ///
    /// Returns the number of released handles; a no-op without a batch.
    pub fn reset(&mut self) -> usize {
        let released = self.ledger.release_all();
        if let Some(batch) = self.batch.take() {
            info!(batch_id = %batch.id, released, "Batch discarded");
            self.sink.clear();
        }
        released
    }

    fn set_state(&mut self, index: usize, state: ItemState) {
        if let Some(item) = self.item_mut(index) {
            item.state = state;
        }
    }

    fn item_mut(&mut self, index: usize) -> Option<&mut ProcessingItem> {
        self.batch.as_mut().and_then(|batch| batch.items.get_mut(index))
    }

    /// Items of the current batch, in submission order
    #[must_use]
    pub fn items(&self) -> &[ProcessingItem] {
        match &self.batch {
            Some(batch) => &batch.items,
            None => &[],
        }
    }

    #[must_use]
    pub fn item(&self, index: usize) -> Option<&ProcessingItem> {
        self.items().get(index)
    }

    /// Completed items of the current batch, in submission order
    pub fn completed_items(&self) -> impl Iterator<Item = &ProcessingItem> + '_ {
        self.items().iter().filter(|item| item.is_completed())
    }

    /// Download action offered by the finished batch
    #[must_use]
    pub fn affordance(&self) -> DownloadAffordance {
        self.batch
            .as_ref()
            .map_or(DownloadAffordance::None, |batch| batch.affordance)
    }

    /// Whether a batch is currently held
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.batch.is_some()
    }

    #[must_use]
    pub fn batch_id(&self) -> Option<Uuid> {
        self.batch.as_ref().map(|batch| batch.id)
    }

    #[must_use]
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }
}
