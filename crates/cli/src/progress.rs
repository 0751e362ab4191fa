//! Progress bar rendering for part uploads

use indicatif::{ProgressBar, ProgressStyle};
use objstore_transfer_storage::{PartProgress, PartProgressCallback};

/// Progress bar fed by the upload manager's per-part callback.
pub struct PartProgressBar {
    bar: ProgressBar,
}

impl PartProgressBar {
    /// Create a bar for a transfer of `total_bytes`, or a spinner when the
    /// size is unknown. A hidden bar is used in quiet mode.
    pub fn new(total_bytes: Option<u64>, label: &str, quiet: bool) -> Self {
        let bar = match (quiet, total_bytes) {
            (true, _) => ProgressBar::hidden(),
            (false, Some(total)) => {
                let pb = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
                ) {
                    pb.set_style(style.progress_chars("#>-"));
                }
                pb
            }
            (false, None) => {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec}) {msg}")
                {
                    pb.set_style(style);
                }
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                pb
            }
        };
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Count bytes that were already stored and will not be sent.
    pub fn skip(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    /// Bytes accounted for so far.
    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish the bar with a closing message.
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Leave the bar in place after a failure.
    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

impl PartProgressCallback for PartProgressBar {
    fn on_part(&self, progress: &PartProgress) {
        match &progress.error {
            None => {
                self.bar.inc(progress.size);
                tracing::debug!(
                    "part {} of {} done ({} bytes, md5 {})",
                    progress.part_number,
                    progress.upload_id,
                    progress.size,
                    progress.md5
                );
            }
            Some(error) => {
                self.bar
                    .println(format!("part {} failed: {}", progress.part_number, error));
            }
        }
    }
}
