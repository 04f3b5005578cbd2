//! Progress reporting for download batches.
//!
//! Workers record outcomes into shared atomic counters; observers receive
//! per-tile events from worker threads and must be thread-safe.

use std::ops::AddAssign;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::coord::TileCoord;
use crate::fetcher::DownloadOutcome;

/// Receives batch lifecycle events from the engine.
///
/// `tile_completed` is called concurrently from worker threads.
pub trait ProgressObserver: Send + Sync {
    /// A dispatch of `tiles` fetches is about to start.
    fn batch_started(&self, _attempt: u32, _tiles: usize) {}

    /// One fetch finished.
    fn tile_completed(&self, _coord: &TileCoord, _outcome: &DownloadOutcome) {}

    /// All workers of the batch have drained.
    fn batch_finished(&self, _attempt: u32, _stats: &BatchStats) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Outcome counts for one batch, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub dispatched: usize,
    pub succeeded: usize,
    pub permanent_misses: usize,
    pub transient_failures: usize,
    /// Tiles never fetched because cancellation was requested.
    pub skipped: usize,
}

impl BatchStats {
    pub fn completed(&self) -> usize {
        self.succeeded + self.permanent_misses + self.transient_failures
    }
}

impl AddAssign for BatchStats {
    fn add_assign(&mut self, other: Self) {
        self.dispatched += other.dispatched;
        self.succeeded += other.succeeded;
        self.permanent_misses += other.permanent_misses;
        self.transient_failures += other.transient_failures;
        self.skipped += other.skipped;
    }
}

/// Shared counters updated by workers during a batch.
#[derive(Debug, Default)]
pub struct BatchCounters {
    dispatched: usize,
    succeeded: AtomicUsize,
    permanent_misses: AtomicUsize,
    transient_failures: AtomicUsize,
    skipped: AtomicUsize,
}

impl BatchCounters {
    /// Counters for a batch of `dispatched` tiles.
    pub fn new(dispatched: usize) -> Self {
        Self {
            dispatched,
            ..Self::default()
        }
    }

    pub fn record(&self, outcome: &DownloadOutcome) {
        let counter = match outcome {
            DownloadOutcome::Success => &self.succeeded,
            DownloadOutcome::PermanentMiss(_) => &self.permanent_misses,
            DownloadOutcome::TransientFailure(_) => &self.transient_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BatchStats {
        BatchStats {
            dispatched: self.dispatched,
            succeeded: self.succeeded.load(Ordering::SeqCst),
            permanent_misses: self.permanent_misses.load(Ordering::SeqCst),
            transient_failures: self.transient_failures.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_record_outcomes() {
        let counters = BatchCounters::new(4);
        counters.record(&DownloadOutcome::Success);
        counters.record(&DownloadOutcome::Success);
        counters.record(&DownloadOutcome::PermanentMiss("HTTP 404".into()));
        counters.record_skipped();

        let stats = counters.snapshot();
        assert_eq!(stats.dispatched, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.permanent_misses, 1);
        assert_eq!(stats.transient_failures, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.completed(), 3);
    }

    #[test]
    fn test_counters_concurrent_updates() {
        let counters = Arc::new(BatchCounters::new(800));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                thread::spawn(move || {
                    for _ in 0..100 {
                        counters.record(&DownloadOutcome::TransientFailure("HTTP 500".into()));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counters.snapshot().transient_failures, 800);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = BatchStats::default();
        total += BatchStats {
            dispatched: 3,
            succeeded: 1,
            permanent_misses: 1,
            transient_failures: 1,
            skipped: 0,
        };
        total += BatchStats {
            dispatched: 2,
            succeeded: 2,
            ..BatchStats::default()
        };
        assert_eq!(total.dispatched, 5);
        assert_eq!(total.succeeded, 3);
        assert_eq!(total.completed(), 5);
    }
}
