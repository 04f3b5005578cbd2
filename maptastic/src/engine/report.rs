//! Run results and engine errors.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::coord::TileCoord;

use super::progress::BatchStats;

/// Errors constructing a [`DownloadEngine`](super::DownloadEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every expected tile is present and non-empty.
    Done,
    /// The retry ceiling was reached (or only permanent misses remain).
    Exhausted,
    /// Stopped by the cancellation flag.
    Cancelled,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Done => write!(f, "done"),
            RunOutcome::Exhausted => write!(f, "exhausted"),
            RunOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Summary of one [`DownloadEngine::run`](super::DownloadEngine::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub outcome: RunOutcome,
    pub expected_tiles: usize,
    /// Number of dispatches performed, including the initial one.
    pub attempts: u32,
    /// Tiles still missing or empty at the end of the run.
    pub unresolved: Vec<TileCoord>,
    /// Tiles that returned 404 at least once during the run.
    pub permanent_misses: Vec<TileCoord>,
    /// Fetch outcomes summed over every batch.
    pub stats: BatchStats,
    pub total_backoff: Duration,
}

impl DownloadReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Done
    }
}
