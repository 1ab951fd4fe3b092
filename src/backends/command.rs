//! External program engine
//!
//! Each file is written to the program's stdin and the cleaned image is read
//! back from its stdout. Whatever image format the program emits is
//! normalized to PNG. The program sees the source file name in the
//! `UNMARK_FILE_NAME` environment variable.

use crate::{
    config::PipelineConfig,
    engine::{EngineFactory, WatermarkEngine},
    error::{PipelineError, Result},
    services::OutputFormatHandler,
    types::{FileCandidate, ProcessedOutput},
};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Environment variable carrying the source file name
pub const FILE_NAME_ENV: &str = "UNMARK_FILE_NAME";

/// Engine backed by an external program
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    preview_max_dimension: u32,
}

impl CommandEngine {
    pub fn new<P: Into<PathBuf>>(program: P, args: Vec<String>, preview_max_dimension: u32) -> Self {
        Self {
            program: program.into(),
            args,
            preview_max_dimension,
        }
    }

    async fn run_program(&self, file: &FileCandidate) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(FILE_NAME_ENV, &file.name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PipelineError::internal(format!(
                    "Failed to spawn '{}': {}",
                    self.program.display(),
                    e
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::internal("Failed to get stdin handle"))?;

        // Feed stdin concurrently so a program that streams output cannot
        // deadlock on a full pipe
        let input = Arc::clone(&file.bytes);
        let writer = tokio::spawn(async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            match written {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        });

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::internal(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        writer
            .await
            .map_err(|e| PipelineError::internal(format!("Stdin writer failed: {}", e)))??;

        debug!(
            file_name = %file.name,
            output_bytes = output.stdout.len(),
            "External program finished"
        );
        Ok(output.stdout)
    }
}

#[async_trait]
impl WatermarkEngine for CommandEngine {
    async fn process(&self, file: &FileCandidate) -> Result<ProcessedOutput> {
        let stdout = self.run_program(file).await?;
        if stdout.is_empty() {
            return Err(PipelineError::internal(format!(
                "'{}' produced no output",
                self.program.display()
            )));
        }

        let original = Arc::clone(&file.bytes);
        let preview_max_dimension = self.preview_max_dimension;

        tokio::task::spawn_blocking(move || -> Result<ProcessedOutput> {
            let (output_bytes, width, height) = OutputFormatHandler::normalize_to_png(&stdout)?;
            // The program may understand formats we cannot decode
            let original_preview = match image::load_from_memory(&original) {
                Ok(decoded) => {
                    OutputFormatHandler::preview(&original, &decoded, preview_max_dimension)?
                },
                Err(_) => original.to_vec(),
            };
            Ok(ProcessedOutput {
                output_bytes,
                original_preview,
                width,
                height,
            })
        })
        .await
        .map_err(|e| PipelineError::internal(format!("Output worker failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// Factory for [`CommandEngine`]
pub struct CommandEngineFactory {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngineFactory {
    pub fn new<P: Into<PathBuf>>(program: P, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a shell-like command line (whitespace separated, no quoting)
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| PipelineError::invalid_config("Engine command must not be empty"))?;
        Ok(Self::new(program, parts.collect()))
    }

    /// Locate the program on disk, searching `PATH` for bare names
    fn resolve_program(&self) -> Option<PathBuf> {
        let has_separator = self.program.components().count() > 1;
        if has_separator || self.program.is_absolute() {
            return self.program.is_file().then(|| self.program.clone());
        }

        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| candidate.is_file())
    }
}

#[async_trait]
impl EngineFactory for CommandEngineFactory {
    async fn create(&self, config: &PipelineConfig) -> Result<Arc<dyn WatermarkEngine>> {
        let program = self.resolve_program().ok_or_else(|| {
            PipelineError::assets_unavailable(format!(
                "Engine program '{}' not found",
                self.program.display()
            ))
        })?;

        info!(program = %program.display(), args = ?self.args, "Command engine ready");
        Ok(Arc::new(CommandEngine::new(
            program,
            self.args.clone(),
            config.preview_max_dimension,
        )))
    }
}
