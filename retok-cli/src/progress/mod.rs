//! Progress reporting module

use indicatif::{ProgressBar, ProgressStyle};
use retok_engine::ProgressObserver;
use std::time::Duration;

/// Progress bar over the characters sent to the model
#[derive(Clone)]
pub struct ProgressReporter {
    progress_bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter; a quiet reporter draws nothing
    pub fn new(quiet: bool) -> Self {
        if quiet {
            return Self {
                progress_bar: ProgressBar::hidden(),
            };
        }

        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} chars {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        pb.set_style(style);
        Self { progress_bar: pb }
    }

    /// Show which file is being repaired
    pub fn set_file(&self, filename: &str) {
        self.progress_bar.set_message(format!("Repairing: {filename}"));
    }

    /// Finish progress reporting once every file is done
    pub fn close(&self) {
        self.progress_bar.finish_with_message("Complete");
    }

    /// Position of the bar, in characters
    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }
}

impl ProgressObserver for ProgressReporter {
    fn start(&self, total_chars: usize) {
        self.progress_bar.set_length(total_chars as u64);
        self.progress_bar.set_position(0);
        self.progress_bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn batch_finished(&self, chars: usize) {
        self.progress_bar.inc(chars as u64);
    }

    fn finish(&self) {
        self.progress_bar.disable_steady_tick();
    }
}
