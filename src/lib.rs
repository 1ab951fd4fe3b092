#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Unmark Batch
//!
//! Batch orchestration and resource-lifecycle layer for a watermark-removal
//! image pipeline.
//!
//! The crate accepts a list of user-selected files, runs each image through
//! a watermark-removal engine strictly one at a time, surfaces per-item
//! results (original preview next to the cleaned output) through a render
//! sink, and offers the cleaned images either as a single download or as one
//! zip archive.
//!
//! ## Features
//!
//! - **Sequential Processing**: input order preserved, one engine call in flight
//! - **Item-Local Failures**: a failing file never aborts the batch
//! - **Handle Ledger**: every preview and output handle is released exactly once
//! - **Bulk Export**: stored zip archives with collision-free entry names
//! - **Pluggable Engines**: in-process pixel transforms or external programs
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use unmark_batch::{
//!     FileCandidate, ImageEngineFactory, NoOpRenderSink, PipelineConfig, PipelineFacade,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pipeline = PipelineFacade::create(
//!     &ImageEngineFactory::identity(),
//!     PipelineConfig::default(),
//!     Arc::new(NoOpRenderSink),
//! )
//! .await?;
//!
//! let file = FileCandidate::from_path("photo.jpg", "image/jpeg")?;
//! let summary = pipeline.submit(vec![file]).await?;
//! println!("{} of {} cleaned", summary.completed, summary.total);
//!
//! let artifact = pipeline.download_one(None).await?;
//! std::fs::write(&artifact.file_name, &*artifact.bytes)?;
//! pipeline.reset().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP input decoding
//! - `tracing-json`: JSON log output
//! - `tracing-files`: log file output
//!
//! To use only as a library without CLI dependencies:
//!
//! ```toml
//! [dependencies]
//! unmark-batch = { version = "0.1", default-features = false }
//! ```

pub mod archive;
pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod facade;
pub mod ledger;
pub mod processor;
pub mod services;
pub mod tracing_config;
pub mod types;

// Public API exports
pub use archive::{unique_entry_names, ArchiveBundle, ArchiveExporter};
pub use backends::*;
pub use config::{BusyPolicy, PipelineConfig, PipelineConfigBuilder};
pub use coordinator::BatchCoordinator;
pub use engine::{EngineFactory, WatermarkEngine};
pub use error::{PipelineError, ProcessingError, Result};
pub use facade::PipelineFacade;
pub use ledger::{MemoryStore, ResourceHandle, ResourceLedger, ResourceStore};
pub use processor::{derive_output_name, derive_output_name_with_prefix, ItemProcessor};
pub use services::{
    ConsoleRenderSink, NoOpRenderSink, OutputFormatHandler, RecordingRenderSink, RenderEvent,
    RenderSink,
};
pub use types::{
    BatchSummary, CompletedOutput, DownloadAffordance, DownloadArtifact, FileCandidate,
    ItemState, ItemStatus, ProcessedOutput, ProcessingItem, ResultView,
};

pub use tracing_config::{events, spans, TracingConfig, TracingFormat, TracingOutput};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingGuard};
