//! Terminal progress for batch runs

use crate::{
    error::ProcessingError,
    services::RenderSink,
    types::{DownloadAffordance, ResultView},
};
use indicatif::{ProgressBar, ProgressStyle};

/// Render sink drawing an indicatif progress bar
pub(crate) struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub(crate) fn new(file_count: usize) -> Self {
        let bar = ProgressBar::new(file_count as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl RenderSink for ProgressBarSink {
    fn render_processing(&self, _index: usize, file_name: &str) {
        self.bar.set_message(format!("Processing {}", file_name));
    }

    fn render_result(&self, view: ResultView) {
        self.bar.set_message(format!("Cleaned {}", view.output_name));
        self.bar.inc(1);
    }

    fn render_failure(&self, _index: usize, error: &ProcessingError) {
        self.bar.println(format!("❌ {}", error));
        self.bar.inc(1);
    }

    fn render_affordance(&self, affordance: DownloadAffordance) {
        let message = match affordance {
            DownloadAffordance::None => "nothing cleaned",
            DownloadAffordance::Single => "1 image cleaned",
            DownloadAffordance::Bulk => "images cleaned",
        };
        self.bar.finish_with_message(message);
    }
}
