//! Configuration types for batch pipeline operations

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default prefix for cleaned output files
pub const DEFAULT_OUTPUT_PREFIX: &str = "clean_";

/// Default prefix for bulk-download archives
pub const DEFAULT_ARCHIVE_PREFIX: &str = "cleaned_images";

/// Default bound on a single engine call
pub const DEFAULT_ENGINE_TIMEOUT_MS: u64 = 120_000;

/// Upper bound accepted for `engine_timeout_ms` (one hour)
const MAX_ENGINE_TIMEOUT_MS: u64 = 3_600_000;

const PATH_SEPARATORS: &[char] = &['/', '\\'];

/// What a facade call does when it arrives while a batch is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Fail immediately with `BatchBusy`
    #[default]
    Reject,
    /// Queue the call until the running batch has finished
    Wait,
}

impl std::fmt::Display for BusyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Wait => write!(f, "wait"),
        }
    }
}

/// Configuration for the batch pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Marker prepended to every derived output name
    pub output_prefix: String,

    /// Name prefix of the bulk-download archive
    pub archive_prefix: String,

    /// Bound on a single engine call in milliseconds (None = wait forever)
    pub engine_timeout_ms: Option<u64>,

    /// Behavior of reset/download calls issued mid-batch
    pub busy_policy: BusyPolicy,

    /// Longest edge of the original preview produced by the image engine (0 = full size)
    pub preview_max_dimension: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            engine_timeout_ms: Some(DEFAULT_ENGINE_TIMEOUT_MS),
            busy_policy: BusyPolicy::default(),
            preview_max_dimension: 0,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unmark_batch::{BusyPolicy, PipelineConfig};
    ///
    /// let config = PipelineConfig::builder()
    ///     .busy_policy(BusyPolicy::Wait)
    ///     .engine_timeout_ms(Some(30_000))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.engine_timeout_ms, Some(30_000));
    /// ```
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults. The loaded configuration
    /// is validated before it is returned.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PipelineError::invalid_config(format!(
                "Failed to parse '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Engine timeout as a `Duration`, if bounded
    #[must_use]
    pub fn engine_timeout(&self) -> Option<Duration> {
        self.engine_timeout_ms.map(Duration::from_millis)
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - Output and archive prefixes must not contain path separators
    /// - Archive prefix must not be empty
    /// - Engine timeout, when set, must be within 1 ms to one hour
    pub fn validate(&self) -> Result<()> {
        if self.output_prefix.contains(PATH_SEPARATORS) {
            return Err(PipelineError::invalid_config(format!(
                "Output prefix must not contain path separators: {:?}",
                self.output_prefix
            )));
        }

        if self.archive_prefix.is_empty() || self.archive_prefix.contains(PATH_SEPARATORS) {
            return Err(PipelineError::invalid_config(format!(
                "Archive prefix must be a non-empty file name: {:?}",
                self.archive_prefix
            )));
        }

        if let Some(timeout) = self.engine_timeout_ms {
            if timeout == 0 || timeout > MAX_ENGINE_TIMEOUT_MS {
                return Err(PipelineError::config_value_error(
                    "engine timeout",
                    timeout,
                    "1-3600000 ms",
                    Some(DEFAULT_ENGINE_TIMEOUT_MS),
                ));
            }
        }

        Ok(())
    }
}

/// Builder for `PipelineConfig`
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the output name marker
    #[must_use]
    pub fn output_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    /// Set the archive name prefix
    #[must_use]
    pub fn archive_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.archive_prefix = prefix.into();
        self
    }

    /// Set the engine call bound (None disables it)
    #[must_use]
    pub fn engine_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.config.engine_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.config.busy_policy = policy;
        self
    }

    #[must_use]
    pub fn preview_max_dimension(mut self, dimension: u32) -> Self {
        self.config.preview_max_dimension = dimension;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<PipelineConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
