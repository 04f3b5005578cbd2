//! Terminal progress bar for download batches.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use maptastic::coord::TileCoord;
use maptastic::engine::{BatchStats, ProgressObserver};
use maptastic::fetcher::DownloadOutcome;

const BAR_TEMPLATE: &str =
    "{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}, {per_sec})";

/// One progress bar per batch, labelled by attempt.
pub struct BatchProgressBar {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl BatchProgressBar {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: false,
        }
    }

    /// A bar that tracks counts without drawing.
    pub fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: true,
        }
    }

    fn current(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Default for BatchProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

/// Bar label for an attempt.
pub fn batch_label(attempt: u32) -> String {
    if attempt == 0 {
        "Downloading Tiles".to_string()
    } else {
        format!("Retrying (Att. {})", attempt)
    }
}

impl ProgressObserver for BatchProgressBar {
    fn batch_started(&self, attempt: u32, tiles: usize) {
        let bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(tiles as u64)
        };
        bar.set_length(tiles as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_message(batch_label(attempt));
        bar.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn tile_completed(&self, _coord: &TileCoord, _outcome: &DownloadOutcome) {
        if let Some(bar) = self.current() {
            bar.inc(1);
        }
    }

    fn batch_finished(&self, _attempt: u32, stats: &BatchStats) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_with_message(format!(
                    "{}: {} ok, {} failed, {} not found",
                    bar.message(),
                    stats.succeeded,
                    stats.transient_failures,
                    stats.permanent_misses
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_labels() {
        assert_eq!(batch_label(0), "Downloading Tiles");
        assert_eq!(batch_label(3), "Retrying (Att. 3)");
    }

    #[test]
    fn test_hidden_bar_counts_tiles() {
        let observer = BatchProgressBar::hidden();
        observer.batch_started(0, 3);
        observer.tile_completed(&TileCoord::new(1, 0, 0), &DownloadOutcome::Success);
        observer.tile_completed(&TileCoord::new(1, 1, 0), &DownloadOutcome::Success);

        let bar = observer.current().unwrap();
        assert_eq!(bar.position(), 2);
        assert_eq!(bar.length(), Some(3));

        observer.batch_finished(0, &BatchStats::default());
        assert!(observer.current().is_none());
    }
}
