//! Test utilities and mock engines for pipeline testing
//!
//! Mock implementations of [`WatermarkEngine`] and [`EngineFactory`] so the
//! coordinator and facade can be tested without decoding real images.

use crate::{
    config::PipelineConfig,
    engine::{EngineFactory, WatermarkEngine},
    error::{PipelineError, Result},
    types::{FileCandidate, ProcessedOutput},
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Width reported by every mock output
pub const MOCK_WIDTH: u32 = 16;
/// Height reported by every mock output
pub const MOCK_HEIGHT: u32 = 8;

/// Decrements the in-flight counter even when the call future is dropped
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock engine with scripted failures, delays and hangs
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    /// Names of every file passed to `process`, in call order
    call_history: Arc<Mutex<Vec<String>>>,
    /// Files that fail
    failing: HashSet<String>,
    /// Files that never complete
    hanging: HashSet<String>,
    /// Simulated work per call
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockEngine {
    /// Create a mock engine that succeeds for every file
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when processing `name`
    #[must_use]
    pub fn failing_on<S: Into<String>>(mut self, name: S) -> Self {
        self.failing.insert(name.into());
        self
    }

    /// Never finish when processing `name`
    #[must_use]
    pub fn hanging_on<S: Into<String>>(mut self, name: S) -> Self {
        self.hanging.insert(name.into());
        self
    }

    /// Sleep for `delay` inside every call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the call history for verification in tests
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Highest number of concurrently running calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatermarkEngine for MockEngine {
    async fn process(&self, file: &FileCandidate) -> Result<ProcessedOutput> {
        self.call_history.lock().unwrap().push(file.name.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.hanging.contains(&file.name) {
            std::future::pending::<()>().await;
        }

        if self.failing.contains(&file.name) {
            return Err(PipelineError::internal(format!(
                "Mock engine failure for {}",
                file.name
            )));
        }

        Ok(ProcessedOutput {
            output_bytes: format!("clean:{}", file.name).into_bytes(),
            original_preview: file.bytes.to_vec(),
            width: MOCK_WIDTH,
            height: MOCK_HEIGHT,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock factory that hands out a prepared engine or fails
pub struct MockEngineFactory {
    engine: Option<MockEngine>,
    failure: Option<String>,
}

impl MockEngineFactory {
    /// Factory that returns a clone of `engine`
    #[must_use]
    pub fn new(engine: MockEngine) -> Self {
        Self {
            engine: Some(engine),
            failure: None,
        }
    }

    /// Factory whose assets are missing
    #[must_use]
    pub fn failing<S: Into<String>>(reason: S) -> Self {
        Self {
            engine: None,
            failure: Some(reason.into()),
        }
    }
}

#[async_trait]
impl EngineFactory for MockEngineFactory {
    async fn create(&self, _config: &PipelineConfig) -> Result<Arc<dyn WatermarkEngine>> {
        match (&self.engine, &self.failure) {
            (_, Some(reason)) => Err(PipelineError::assets_unavailable(reason.clone())),
            (Some(engine), None) => Ok(Arc::new(engine.clone())),
            (None, None) => Ok(Arc::new(MockEngine::new())),
        }
    }
}

/// Candidate with an image media type
pub fn image_file(name: &str) -> FileCandidate {
    FileCandidate::new(name, "image/png", format!("original:{name}").into_bytes())
}

/// Candidate with a non-image media type
pub fn text_file(name: &str) -> FileCandidate {
    FileCandidate::new(name, "text/plain", b"hello".to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let engine = MockEngine::new().failing_on("bad.png");

        assert!(engine.process(&image_file("a.png")).await.is_ok());
        assert!(engine.process(&image_file("bad.png")).await.is_err());
        assert_eq!(engine.call_history(), vec!["a.png", "bad.png"]);
        assert_eq!(engine.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_history() {
        let engine = MockEngine::new();
        let clone = engine.clone();
        clone.process(&image_file("a.png")).await.unwrap();
        assert_eq!(engine.call_history(), vec!["a.png"]);
    }
}
