//! Core data types for batch processing

use crate::ledger::ResourceHandle;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// A user-selected file offered to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// File name as shown to the user
    pub name: String,
    /// Declared media type (e.g. `image/png`)
    pub media_type: String,
    /// Raw file content
    pub bytes: Arc<[u8]>,
}

impl FileCandidate {
    /// Create a new candidate from its parts
    pub fn new<N, M, B>(name: N, media_type: M, bytes: B) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        B: Into<Arc<[u8]>>,
    {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a candidate from disk with an explicit media type
    ///
    /// The candidate name is the final path component.
    pub fn from_path<P: AsRef<Path>, M: Into<String>>(
        path: P,
        media_type: M,
    ) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, media_type, bytes))
    }

    /// Whether the declared media type is of the `image` class
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type
            .trim()
            .parse::<mime::Mime>()
            .is_ok_and(|m| m.type_() == mime::IMAGE)
    }
}

/// What the engine returns for one successfully processed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedOutput {
    /// Encoded cleaned image (PNG)
    pub output_bytes: Vec<u8>,
    /// Renderable representation of the original for side-by-side comparison
    pub original_preview: Vec<u8>,
    /// Pixel width of the output
    pub width: u32,
    /// Pixel height of the output
    pub height: u32,
}

/// Result payload of a completed item
///
/// The output blob and its download handle only ever exist together.
#[derive(Debug, Clone)]
pub struct CompletedOutput {
    /// Derived download file name (`clean_<stem>.png`)
    pub output_name: String,
    /// Encoded output bytes
    pub output_blob: Arc<[u8]>,
    /// Ledger handle for the output blob
    pub download_handle: ResourceHandle,
    pub width: u32,
    pub height: u32,
}

/// Per-item state machine
#[derive(Debug, Clone)]
pub enum ItemState {
    Queued,
    Processing,
    Completed(CompletedOutput),
    /// Failure message for diagnostics
    Failed(String),
}

impl ItemState {
    /// Payload-free view of the state
    #[must_use]
    pub fn status(&self) -> ItemStatus {
        match self {
            Self::Queued => ItemStatus::Queued,
            Self::Processing => ItemStatus::Processing,
            Self::Completed(_) => ItemStatus::Completed,
            Self::Failed(_) => ItemStatus::Failed,
        }
    }
}

/// Payload-free item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One file's journey through the pipeline
#[derive(Debug, Clone)]
pub struct ProcessingItem {
    /// Position in the batch (dense, stable for the batch lifetime)
    pub index: usize,
    /// File name as submitted
    pub source_name: String,
    pub state: ItemState,
    /// Ledger handle of the original preview, once the engine produced one
    pub original_preview_handle: Option<ResourceHandle>,
}

impl ProcessingItem {
    /// Create a queued item
    #[must_use]
    pub fn queued(index: usize, source_name: String) -> Self {
        Self {
            index,
            source_name,
            state: ItemState::Queued,
            original_preview_handle: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> ItemStatus {
        self.state.status()
    }

    /// Completed payload, if the item finished successfully
    #[must_use]
    pub fn completed(&self) -> Option<&CompletedOutput> {
        match &self.state {
            ItemState::Completed(output) => Some(output),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed().is_some()
    }
}

/// Trailing download action exposed once a batch finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadAffordance {
    /// Nothing to download
    #[default]
    None,
    /// Exactly one completed item: direct download
    Single,
    /// Several completed items: archive download
    Bulk,
}

impl DownloadAffordance {
    /// Derive the affordance from the number of completed items
    #[must_use]
    pub fn from_completed(count: usize) -> Self {
        match count {
            0 => Self::None,
            1 => Self::Single,
            _ => Self::Bulk,
        }
    }
}

/// Outcome of a submitted batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    /// Number of accepted files
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub affordance: DownloadAffordance,
    pub elapsed_ms: u64,
}

/// Everything a sink needs to render a finished item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub index: usize,
    pub source_name: String,
    /// Name the download action must use
    pub output_name: String,
    pub original_preview: ResourceHandle,
    pub output: ResourceHandle,
    pub width: u32,
    pub height: u32,
}

/// A file ready to be handed to the user
#[derive(Debug, Clone)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
    /// Ledger handle backing the bytes (archives are not ledger-tracked)
    pub handle: Option<ResourceHandle>,
}
