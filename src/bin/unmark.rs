//! Unmark CLI Tool
//!
//! Command-line interface for batch watermark removal built on the
//! unmark-batch library.

#[cfg(feature = "cli")]
use unmark_batch::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
