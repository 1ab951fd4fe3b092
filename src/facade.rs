//! Pipeline boundary
//!
//! [`PipelineFacade`] is what frontends call. It creates the engine once,
//! serializes access to the [`BatchCoordinator`] and turns completed items
//! into downloadable artifacts.

use crate::{
    archive::ArchiveExporter,
    config::{BusyPolicy, PipelineConfig},
    coordinator::BatchCoordinator,
    engine::{EngineFactory, WatermarkEngine},
    error::{PipelineError, Result},
    ledger::{MemoryStore, ResourceHandle, ResourceLedger, ResourceStore},
    processor::ItemProcessor,
    services::RenderSink,
    tracing_config::spans,
    types::{BatchSummary, DownloadAffordance, DownloadArtifact, FileCandidate, ItemStatus},
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, Instrument};

/// Entry point for frontends
pub struct PipelineFacade {
    coordinator: Mutex<BatchCoordinator>,
    exporter: ArchiveExporter,
    config: PipelineConfig,
    engine_name: String,
}

impl PipelineFacade {
    /// Create the engine and assemble a pipeline over an in-memory store
    ///
    /// # Errors
    /// - `InvalidConfig` if `config` does not validate
    /// - `AssetsUnavailable` if the engine cannot be created; no pipeline is
    ///   produced and the session is unusable
    pub async fn create(
        factory: &dyn EngineFactory,
        config: PipelineConfig,
        sink: Arc<dyn RenderSink>,
    ) -> Result<Self> {
        Self::create_with_store(factory, config, sink, Arc::new(MemoryStore::new())).await
    }

    /// Like [`PipelineFacade::create`], backed by a custom resource store
    pub async fn create_with_store(
        factory: &dyn EngineFactory,
        config: PipelineConfig,
        sink: Arc<dyn RenderSink>,
        store: Arc<dyn ResourceStore>,
    ) -> Result<Self> {
        config.validate()?;

        let span = spans::engine_creation(&format!(
            "timeout={:?} busy_policy={}",
            config.engine_timeout_ms, config.busy_policy
        ));
        let engine = factory
            .create(&config)
            .instrument(span)
            .await
            .map_err(|e| {
                if e.is_fatal() {
                    e
                } else {
                    PipelineError::assets_unavailable(e.to_string())
                }
            })?;

        Ok(Self::assemble(engine, config, sink, store))
    }

    /// Assemble a pipeline around an already created engine
    pub fn with_engine(
        engine: Arc<dyn WatermarkEngine>,
        config: PipelineConfig,
        sink: Arc<dyn RenderSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(engine, config, sink, Arc::new(MemoryStore::new())))
    }

    fn assemble(
        engine: Arc<dyn WatermarkEngine>,
        config: PipelineConfig,
        sink: Arc<dyn RenderSink>,
        store: Arc<dyn ResourceStore>,
    ) -> Self {
        let engine_name = engine.name().to_string();
        let processor = ItemProcessor::new(engine, &config);
        let coordinator = BatchCoordinator::new(processor, ResourceLedger::new(store), sink);

        info!(engine = %engine_name, busy_policy = %config.busy_policy, "Pipeline ready");
        Self {
            coordinator: Mutex::new(coordinator),
            exporter: ArchiveExporter::new(&config),
            config,
            engine_name,
        }
    }

    async fn acquire(&self) -> Result<MutexGuard<'_, BatchCoordinator>> {
        match self.config.busy_policy {
            BusyPolicy::Reject => self.coordinator.try_lock().map_err(|_| {
                debug!("Rejected call while a batch is running");
                PipelineError::BatchBusy
            }),
            BusyPolicy::Wait => Ok(self.coordinator.lock().await),
        }
    }

    /// Replace the current batch with `files` and process them
    ///
    /// A submission arriving while another batch runs waits for it.
    pub async fn submit(&self, files: Vec<FileCandidate>) -> Result<BatchSummary> {
        self.coordinator.lock().await.submit(files).await
    }

    /// Discard the current batch, returning the number of released handles
    pub async fn reset(&self) -> Result<usize> {
        Ok(self.acquire().await?.reset())
    }

    /// Download one cleaned image
    ///
    /// With `None`, the batch must have exactly one completed item. With
    /// `Some(index)`, the item at `index` must be completed.
    pub async fn download_one(&self, index: Option<usize>) -> Result<DownloadArtifact> {
        let coordinator = self.acquire().await?;

        let item = match index {
            None => {
                let completed = coordinator.completed_items().count();
                if completed != 1 {
                    return Err(PipelineError::download_unavailable(format!(
                        "Single download needs exactly one cleaned image, batch has {}",
                        completed
                    )));
                }
                coordinator.completed_items().next()
            },
            Some(index) => coordinator.item(index),
        }
        .ok_or_else(|| PipelineError::download_unavailable("No such item in the current batch"))?;

        let output = item.completed().ok_or_else(|| {
            PipelineError::download_unavailable(format!(
                "Item {} ({}) is {}",
                item.index,
                item.source_name,
                item.status()
            ))
        })?;

        info!(file_name = %output.output_name, "Serving single download");
        Ok(DownloadArtifact {
            file_name: output.output_name.clone(),
            bytes: Arc::clone(&output.output_blob),
            handle: Some(output.download_handle.clone()),
        })
    }

    /// Download every cleaned image as one archive
    pub async fn download_all(&self) -> Result<DownloadArtifact> {
        let coordinator = self.acquire().await?;
        let bundle = self.exporter.build_archive(coordinator.items())?;

        Ok(DownloadArtifact {
            file_name: bundle.file_name,
            bytes: Arc::from(bundle.bytes),
            handle: None,
        })
    }

    /// Download action offered by the finished batch
    pub async fn affordance(&self) -> Result<DownloadAffordance> {
        Ok(self.acquire().await?.affordance())
    }

    /// Status of every item in the current batch, in order
    pub async fn item_statuses(&self) -> Result<Vec<ItemStatus>> {
        let coordinator = self.acquire().await?;
        Ok(coordinator.items().iter().map(|item| item.status()).collect())
    }

    /// Number of handles owned by the current batch
    pub async fn live_handles(&self) -> Result<usize> {
        Ok(self.acquire().await?.ledger().live_count())
    }

    /// Content behind a handle of the current batch
    pub async fn resolve(&self, handle: &ResourceHandle) -> Result<Option<Arc<[u8]>>> {
        Ok(self.acquire().await?.ledger().resolve(handle))
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }
}
