//! In-process image engine
//!
//! Decodes the submitted file with the `image` crate, hands the pixels to an
//! opaque [`PixelTransform`], and encodes the result as PNG. The transform is
//! where a watermark-removal algorithm plugs in; [`IdentityTransform`] passes
//! pixels through unchanged.

use crate::{
    config::PipelineConfig,
    engine::{EngineFactory, WatermarkEngine},
    error::{PipelineError, Result},
    services::OutputFormatHandler,
    types::{FileCandidate, ProcessedOutput},
};
use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Auxiliary images an engine needs at runtime (e.g. watermark alpha maps)
#[derive(Debug, Default)]
pub struct EngineAssets {
    images: HashMap<String, RgbaImage>,
}

impl EngineAssets {
    /// Load the named assets from `dir`
    ///
    /// # Errors
    /// - `AssetsUnavailable` if any asset is missing or cannot be decoded
    pub fn load_dir<S: AsRef<str>>(dir: &Path, names: &[S]) -> Result<Self> {
        let mut images = HashMap::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let path = dir.join(name);
            let image = image::open(&path).map_err(|e| {
                PipelineError::assets_unavailable(format!(
                    "Failed to load asset '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            debug!(asset = %name, width = image.width(), height = image.height(), "Loaded engine asset");
            images.insert(name.to_string(), image.to_rgba8());
        }
        Ok(Self { images })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RgbaImage> {
        self.images.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Pixel-level cleaning step
pub trait PixelTransform: Send + Sync {
    /// Clean `image` in place
    ///
    /// # Errors
    /// - Input the transform cannot handle (unsupported size, missing asset)
    fn apply(&self, image: &mut RgbaImage, assets: &EngineAssets) -> Result<()>;
}

/// Transform that leaves pixels untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl PixelTransform for IdentityTransform {
    fn apply(&self, _image: &mut RgbaImage, _assets: &EngineAssets) -> Result<()> {
        Ok(())
    }
}

/// Engine that runs a [`PixelTransform`] on decoded pixels
pub struct ImageEngine {
    transform: Arc<dyn PixelTransform>,
    assets: Arc<EngineAssets>,
    preview_max_dimension: u32,
}

impl ImageEngine {
    pub fn new(
        transform: Arc<dyn PixelTransform>,
        assets: EngineAssets,
        preview_max_dimension: u32,
    ) -> Self {
        Self {
            transform,
            assets: Arc::new(assets),
            preview_max_dimension,
        }
    }

    fn render(
        bytes: &[u8],
        transform: &dyn PixelTransform,
        assets: &EngineAssets,
        preview_max_dimension: u32,
    ) -> Result<ProcessedOutput> {
        let decoded = image::load_from_memory(bytes)?;
        let mut pixels = decoded.to_rgba8();
        transform.apply(&mut pixels, assets)?;

        let (width, height) = pixels.dimensions();
        let output_bytes = OutputFormatHandler::encode_png(&DynamicImage::ImageRgba8(pixels))?;
        let original_preview = OutputFormatHandler::preview(bytes, &decoded, preview_max_dimension)?;

        Ok(ProcessedOutput {
            output_bytes,
            original_preview,
            width,
            height,
        })
    }
}

#[async_trait]
impl WatermarkEngine for ImageEngine {
    async fn process(&self, file: &FileCandidate) -> Result<ProcessedOutput> {
        let bytes = Arc::clone(&file.bytes);
        let transform = Arc::clone(&self.transform);
        let assets = Arc::clone(&self.assets);
        let preview_max_dimension = self.preview_max_dimension;

        // Decoding and encoding are CPU-bound
        tokio::task::spawn_blocking(move || {
            Self::render(&bytes, transform.as_ref(), &assets, preview_max_dimension)
        })
        .await
        .map_err(|e| PipelineError::internal(format!("Image worker failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "image"
    }
}

/// Factory for [`ImageEngine`]
pub struct ImageEngineFactory {
    transform: Arc<dyn PixelTransform>,
    asset_dir: Option<PathBuf>,
    required_assets: Vec<String>,
}

impl ImageEngineFactory {
    pub fn new(transform: Arc<dyn PixelTransform>) -> Self {
        Self {
            transform,
            asset_dir: None,
            required_assets: Vec::new(),
        }
    }

    /// Factory for the pass-through engine
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Arc::new(IdentityTransform))
    }

    /// Require `names` to be loadable from `dir` when the engine is created
    #[must_use]
    pub fn with_assets<P: Into<PathBuf>>(mut self, dir: P, names: Vec<String>) -> Self {
        self.asset_dir = Some(dir.into());
        self.required_assets = names;
        self
    }
}

#[async_trait]
impl EngineFactory for ImageEngineFactory {
    async fn create(&self, config: &PipelineConfig) -> Result<Arc<dyn WatermarkEngine>> {
        let assets = match &self.asset_dir {
            Some(dir) => {
                let dir = dir.clone();
                let names = self.required_assets.clone();
                tokio::task::spawn_blocking(move || EngineAssets::load_dir(&dir, &names))
                    .await
                    .map_err(|e| {
                        PipelineError::assets_unavailable(format!("Asset loader failed: {}", e))
                    })??
            },
            None => EngineAssets::default(),
        };

        info!(assets = assets.len(), "Image engine ready");
        Ok(Arc::new(ImageEngine::new(
            Arc::clone(&self.transform),
            assets,
            config.preview_max_dimension,
        )))
    }
}
