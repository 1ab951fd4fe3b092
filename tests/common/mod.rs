//! Shared engines, stores and image builders for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use unmark_batch::{
    EngineFactory, FileCandidate, MemoryStore, OutputFormatHandler, PipelineConfig, PipelineError,
    ProcessedOutput, ResourceHandle, ResourceStore, Result, WatermarkEngine,
};
use uuid::Uuid;

/// Engine with per-file scripted behavior
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    calls: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn hanging_on(mut self, name: &str) -> Self {
        self.hanging.insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatermarkEngine for ScriptedEngine {
    async fn process(&self, file: &FileCandidate) -> Result<ProcessedOutput> {
        self.calls.lock().unwrap().push(file.name.clone());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(Arc::clone(&self.in_flight));
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.hanging.contains(&file.name) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&file.name) {
            return Err(PipelineError::internal(format!("cannot clean {}", file.name)));
        }

        Ok(ProcessedOutput {
            output_bytes: format!("cleaned {}", file.name).into_bytes(),
            original_preview: file.bytes.to_vec(),
            width: 32,
            height: 24,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Factory handing out a prepared scripted engine
pub struct ScriptedFactory(pub ScriptedEngine);

#[async_trait]
impl EngineFactory for ScriptedFactory {
    async fn create(&self, _config: &PipelineConfig) -> Result<Arc<dyn WatermarkEngine>> {
        Ok(Arc::new(self.0.clone()))
    }
}

/// Store that counts how often each handle is revoked
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    created: Mutex<Vec<Uuid>>,
    revocations: Mutex<HashMap<Uuid, usize>>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Handles revoked more than once
    pub fn double_revocations(&self) -> usize {
        self.revocations
            .lock()
            .unwrap()
            .values()
            .filter(|count| **count > 1)
            .count()
    }

    /// Handles created but never revoked
    pub fn never_revoked(&self) -> usize {
        let revocations = self.revocations.lock().unwrap();
        self.created
            .lock()
            .unwrap()
            .iter()
            .filter(|id| !revocations.contains_key(id))
            .count()
    }
}

impl ResourceStore for CountingStore {
    fn create(&self, bytes: Arc<[u8]>) -> ResourceHandle {
        let handle = self.inner.create(bytes);
        self.created.lock().unwrap().push(handle.id());
        handle
    }

    fn revoke(&self, handle: &ResourceHandle) -> bool {
        *self.revocations.lock().unwrap().entry(handle.id()).or_insert(0) += 1;
        self.inner.revoke(handle)
    }

    fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<[u8]>> {
        self.inner.resolve(handle)
    }

    fn live_count(&self) -> usize {
        self.inner.live_count()
    }
}

/// Candidate declared as a PNG image (content is not decoded by scripted engines)
pub fn image_file(name: &str) -> FileCandidate {
    FileCandidate::new(name, "image/png", format!("pixels of {name}").into_bytes())
}

pub fn text_file(name: &str) -> FileCandidate {
    FileCandidate::new(name, "text/plain", b"just text".to_vec())
}

/// Real PNG bytes of a solid image
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([120, 80, 40, 255]));
    OutputFormatHandler::encode_png(&DynamicImage::ImageRgba8(image)).unwrap()
}

/// Real JPEG bytes of a solid image
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 30, 90]),
    ));
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}

/// Entry names and contents of a zip archive
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}
