//! Watermark removal CLI tool
//!
//! Feeds files from disk through the batch pipeline and writes either the
//! single cleaned image or the bulk archive.

use super::config::CliConfigBuilder;
use super::progress::ProgressBarSink;
use crate::{
    facade::PipelineFacade,
    services::{NoOpRenderSink, RenderSink},
    tracing_config::{events, init_cli_tracing, TracingGuard},
    types::{DownloadAffordance, FileCandidate},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Batch watermark removal tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "unmark")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output directory for the cleaned image or archive [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<String>,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// JSON configuration file (flags override its values)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Prefix of cleaned file names [default: clean_]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Prefix of the bulk archive name [default: cleaned_images]
    #[arg(long)]
    pub archive_prefix: Option<String>,

    /// Per-image engine timeout in milliseconds [default: 120000]
    #[arg(long, value_name = "MS", conflicts_with = "no_timeout")]
    pub timeout_ms: Option<u64>,

    /// Wait for the engine without a time limit
    #[arg(long)]
    pub no_timeout: bool,

    /// Longest edge of original previews (0 = full size)
    #[arg(long, value_name = "PX")]
    pub preview_size: Option<u32>,

    /// External engine command; reads an image on stdin, writes the cleaned image to stdout
    #[arg(long, value_name = "COMMAND")]
    pub engine_cmd: Option<String>,

    /// Directory holding the built-in engine's assets
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Asset file that must be present in --assets (repeatable)
    #[arg(long, value_name = "NAME")]
    pub asset: Vec<String>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _tracing: TracingGuard =
        init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli)?;
    let factory = CliConfigBuilder::engine_factory(&cli)?;

    let paths = collect_inputs(&cli.input, cli.recursive)?;
    if paths.is_empty() {
        anyhow::bail!("No input files found");
    }
    let output_dir = prepare_output_dir(cli.output.as_deref())?;
    let candidates = load_candidates(&paths)?;
    events::progress(&format!("Found {} file(s)", candidates.len()));

    let sink: Arc<dyn RenderSink> = if cli.quiet {
        Arc::new(NoOpRenderSink)
    } else {
        Arc::new(ProgressBarSink::new(candidates.len()))
    };

    let pipeline = PipelineFacade::create(factory.as_ref(), config, sink)
        .await
        .context("Failed to initialize the watermark engine. Assets not found?")?;

    let summary = pipeline
        .submit(candidates)
        .await
        .context("No image files to process")?;
    info!(
        "Cleaned {} of {} image(s) in {}ms",
        summary.completed, summary.total, summary.elapsed_ms
    );

    let artifact = match summary.affordance {
        DownloadAffordance::Single => pipeline.download_one(None).await?,
        DownloadAffordance::Bulk => pipeline.download_all().await?,
        DownloadAffordance::None => {
            pipeline.reset().await?;
            anyhow::bail!("All {} image(s) failed", summary.failed);
        },
    };

    let destination = output_dir.join(&artifact.file_name);
    tokio::fs::write(&destination, &*artifact.bytes)
        .await
        .with_context(|| format!("Failed to write {}", destination.display()))?;
    info!("Saved {}", destination.display());

    if summary.failed > 0 {
        events::warning_with_recommendation(
            &format!("{} image(s) could not be cleaned", summary.failed),
            "Rerun with -v to see the cause of each failure",
        );
    }

    let released = pipeline.reset().await?;
    debug!(released, "Session resources released");
    Ok(())
}

/// Expand inputs into files, sorted alphanumerically per directory
///
/// Files named explicitly are kept regardless of type; the pipeline filters
/// them by media type. Directory walks only pick up image files.
fn collect_inputs(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            files.extend(find_image_files(&path, recursive)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    Ok(files)
}

/// Find image files in a directory
fn find_image_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        if entry.file_type().is_file() && guess_media_type(entry.path()).starts_with("image/") {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Media type from the file extension
fn guess_media_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn load_candidates(paths: &[PathBuf]) -> Result<Vec<FileCandidate>> {
    paths
        .iter()
        .map(|path| {
            FileCandidate::from_path(path, guess_media_type(path))
                .with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect()
}

fn prepare_output_dir(output: Option<&str>) -> Result<PathBuf> {
    let Some(output) = output else {
        return Ok(PathBuf::from("."));
    };

    let path = PathBuf::from(output);
    if path.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            path.display()
        );
    }
    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create output directory: {}", path.display()))?;
    Ok(path)
}
