//! Progress bar for a running batch

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use solbatch_build::{CompilationOutcome, ProgressObserver};
use std::path::Path;
use std::time::Duration;

/// Shows a progress bar on stderr while files compile
///
/// Hidden when stderr is not a terminal.
pub struct BarProgress {
    bar: ProgressBar,
    root: std::path::PathBuf,
}

impl BarProgress {
    /// Create a bar; paths are shown relative to `root`
    pub fn new(root: &Path) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            root: root.to_path_buf(),
        }
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for BarProgress {
    fn batch_started(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn file_started(&self, _index: usize, _total: usize, path: &Path) {
        let shown = path.strip_prefix(&self.root).unwrap_or(path);
        self.bar.set_message(shown.display().to_string());
    }

    fn file_finished(&self, _index: usize, _total: usize, outcome: &CompilationOutcome) {
        if !outcome.is_success() {
            let shown = outcome.path.strip_prefix(&self.root).unwrap_or(&outcome.path);
            self.bar.println(format!("failed: {}", shown.display()));
        }
        self.bar.inc(1);
    }
}
