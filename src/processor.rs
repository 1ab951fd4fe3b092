//! Single-file processing
//!
//! [`ItemProcessor`] drives one file through the watermark engine exactly
//! once and turns every failure into an item-local [`ProcessingError`].

use crate::{
    config::{PipelineConfig, DEFAULT_OUTPUT_PREFIX},
    engine::WatermarkEngine,
    error::ProcessingError,
    services::OutputFormatHandler,
    types::{FileCandidate, ProcessedOutput},
};
use instant::Instant;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Runs the engine for one file at a time
pub struct ItemProcessor {
    engine: Arc<dyn WatermarkEngine>,
    timeout: Option<Duration>,
    output_prefix: String,
}

impl ItemProcessor {
    /// Create a processor around an engine
    pub fn new(engine: Arc<dyn WatermarkEngine>, config: &PipelineConfig) -> Self {
        Self {
            engine,
            timeout: config.engine_timeout(),
            output_prefix: config.output_prefix.clone(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<dyn WatermarkEngine> {
        &self.engine
    }

    /// Download name for a processed `source`
    #[must_use]
    pub fn output_name(&self, source: &str) -> String {
        derive_output_name_with_prefix(source, &self.output_prefix)
    }

    /// Invoke the engine once for `file`
    ///
    /// No retry is attempted. When a timeout is configured, an engine call
    /// that outlives it is abandoned and reported as a failure.
    #[instrument(
        name = "item_processing",
        skip(self, file),
        fields(file_name = %file.name, engine = %self.engine.name(), size_bytes = file.bytes.len())
    )]
    pub async fn run(&self, file: &FileCandidate) -> Result<ProcessedOutput, ProcessingError> {
        let start = Instant::now();
        let call = self.engine.process(file);

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(ProcessingError::new(
                        &file.name,
                        format!("engine did not respond within {}ms", limit.as_millis()),
                    ))
                },
            },
            None => call.await,
        };

        let output = outcome.map_err(|e| ProcessingError::new(&file.name, e.to_string()))?;
        if output.output_bytes.is_empty() {
            return Err(ProcessingError::new(&file.name, "engine returned an empty image"));
        }

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            width = output.width,
            height = output.height,
            "Engine call finished"
        );
        Ok(output)
    }
}

/// Derive the download name of a cleaned file with the default prefix
///
/// ```rust
/// use unmark_batch::processor::derive_output_name;
///
/// assert_eq!(derive_output_name("photo.JPG"), "clean_photo.png");
/// assert_eq!(derive_output_name("a.b.png"), "clean_a.b.png");
/// ```
#[must_use]
pub fn derive_output_name(source: &str) -> String {
    derive_output_name_with_prefix(source, DEFAULT_OUTPUT_PREFIX)
}

/// Derive the download name of a cleaned file
///
/// Only the final path component of `source` is used. Its last extension is
/// stripped, a leading dot included (`.hidden` has an empty stem); a name
/// ending in a dot has no extension to strip.
#[must_use]
pub fn derive_output_name_with_prefix(source: &str, prefix: &str) -> String {
    format!(
        "{}{}.{}",
        prefix,
        file_stem(base_name(source)),
        OutputFormatHandler::OUTPUT_EXTENSION
    )
}

const PATH_SEPARATORS: &[char] = &['/', '\\'];

fn base_name(source: &str) -> &str {
    source.rsplit(PATH_SEPARATORS).next().unwrap_or(source)
}

fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => name.get(..dot).unwrap_or(name),
        _ => name,
    }
}
