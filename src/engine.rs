//! Watermark engine abstraction
//!
//! The removal algorithm itself is an external collaborator. The pipeline only
//! needs to create an engine once per session and call `process` once per
//! file. Concrete engines live in [`crate::backends`].

use crate::{
    config::PipelineConfig,
    error::Result,
    types::{FileCandidate, ProcessedOutput},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque asynchronous watermark-removal transform
#[async_trait]
pub trait WatermarkEngine: Send + Sync {
    /// Clean one file
    ///
    /// # Errors
    /// - Unsupported or undecodable input
    /// - Internal engine failures
    async fn process(&self, file: &FileCandidate) -> Result<ProcessedOutput>;

    /// Short engine name for logs
    fn name(&self) -> &str;
}

/// Creates engines at session start
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Create an engine instance
    ///
    /// # Errors
    /// - `AssetsUnavailable` when auxiliary resources cannot be loaded
    async fn create(&self, config: &PipelineConfig) -> Result<Arc<dyn WatermarkEngine>>;
}
