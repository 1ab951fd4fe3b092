//! Error types for batch pipeline operations

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure of a single item inside a batch
///
/// Carries the original file name so the failure can be logged and shown
/// next to the card it belongs to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to process '{file_name}': {cause}")]
pub struct ProcessingError {
    /// Source file name as submitted
    pub file_name: String,
    /// Underlying cause reported by the engine (or the timeout)
    pub cause: String,
}

impl ProcessingError {
    /// Create a new item processing error
    pub fn new<N: Into<String>, C: Into<String>>(file_name: N, cause: C) -> Self {
        Self {
            file_name: file_name.into(),
            cause: cause.into(),
        }
    }
}

/// Error types for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Engine could not be initialized because its auxiliary assets are missing
    #[error("Assets unavailable: {0}")]
    AssetsUnavailable(String),

    /// A submission contained no accepted image files
    #[error("No valid image files in submission")]
    NoValidFiles,

    /// One item failed inside the engine
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// A batch is currently running and the call was rejected
    #[error("A batch is currently being processed")]
    BatchBusy,

    /// The requested download does not match the current batch
    #[error("Download unavailable: {0}")]
    DownloadUnavailable(String),

    /// Archive writer failure
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode or encode failure
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Create a new assets-unavailable error
    pub fn assets_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::AssetsUnavailable(msg.into())
    }

    /// Create a new download-unavailable error
    pub fn download_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::DownloadUnavailable(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether this error leaves the whole session unusable
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AssetsUnavailable(_))
    }
}
