//! Bulk download engine.
//!
//! [`DownloadEngine`] turns a region and zoom range into a complete set of
//! tiles on disk. Each cycle re-verifies the whole expected set against the
//! store, dispatches the gaps to a bounded worker pool, waits for every
//! worker to drain and backs off before the next cycle:
//!
//! ```text
//! Init ──► Verify ──clean──► Done
//!            │
//!            ├──ceiling reached──► Exhausted
//!            ▼
//!         Dispatch ──► Wait ──► Verify ...
//! ```
//!
//! Verification is the only success criterion. A tile whose fetch fails but
//! which already exists on disk counts as present.

mod cancel;
mod config;
mod progress;
mod report;

pub use cancel::CancellationFlag;
pub use config::{
    BatchRetryPolicy, EngineConfig, RetryState, DEFAULT_BATCH_RETRIES,
    DEFAULT_UNRESOLVED_LOG_LIMIT, DEFAULT_WORKERS,
};
pub use progress::{BatchCounters, BatchStats, NoopObserver, ProgressObserver};
pub use report::{DownloadReport, EngineError, RunOutcome};

use std::collections::BTreeSet;
use std::time::Duration;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{error, info, warn};

use crate::coord::{tiles_for_region, Region, TileCoord, ZoomRange};
use crate::fetcher::TileFetcher;
use crate::provider::HttpClient;
use crate::store::{TileStore, VerifyReport};

/// Drives the verify / dispatch / back-off cycle for one tile set.
pub struct DownloadEngine<C: HttpClient> {
    fetcher: TileFetcher<C>,
    config: EngineConfig,
    pool: ThreadPool,
    cancel: CancellationFlag,
}

impl<C: HttpClient> DownloadEngine<C> {
    /// Creates an engine with its own pool of `config.workers` threads.
    pub fn new(fetcher: TileFetcher<C>, config: EngineConfig) -> Result<Self, EngineError> {
        if config.workers == 0 {
            return Err(EngineError::NoWorkers);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("maptastic-fetch-{}", i))
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?;

        Ok(Self {
            fetcher,
            config,
            pool,
            cancel: CancellationFlag::new(),
        })
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &TileStore {
        self.fetcher.store()
    }

    pub fn fetcher(&self) -> &TileFetcher<C> {
        &self.fetcher
    }

    /// Download every tile covering `region` over `zooms`.
    pub fn run(
        &self,
        region: &Region,
        zooms: ZoomRange,
        observer: &dyn ProgressObserver,
    ) -> DownloadReport {
        let expected: Vec<TileCoord> = tiles_for_region(region, zooms).collect();
        info!(region = %region, zooms = %zooms, "Starting region download");
        self.run_tiles(&expected, observer)
    }

    /// Download an explicit tile set until it verifies, the retry ceiling
    /// is reached, or the run is cancelled.
    pub fn run_tiles(
        &self,
        expected: &[TileCoord],
        observer: &dyn ProgressObserver,
    ) -> DownloadReport {
        let mut run = RunState::new(expected.len());

        if expected.is_empty() {
            warn!("No tiles found for the specified region and zoom levels");
            return run.finish(RunOutcome::Done);
        }

        info!(tiles = expected.len(), "Total tiles expected for integrity");
        let max_retries = self.config.retry.max_retries;

        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(run);
            }

            run.verification = self.store().verify(expected);
            let unresolved = run.verification.unresolved();

            if unresolved.is_empty() {
                if run.retry.attempt > max_retries {
                    info!("All tiles present and non-empty after final integrity check");
                } else {
                    info!("Verification complete: all tiles downloaded and verified");
                }
                return run.finish(RunOutcome::Done);
            }

            if run.retry.attempt > max_retries {
                return self.exhausted(run);
            }

            let pending: Vec<TileCoord> = if self.config.skip_permanent_misses {
                unresolved
                    .into_iter()
                    .filter(|c| !run.permanent_misses.contains(c))
                    .collect()
            } else {
                unresolved
            };

            if pending.is_empty() {
                warn!(
                    tiles = run.verification.unresolved_count(),
                    "Only tiles the provider does not serve remain; not retrying them"
                );
                return self.exhausted(run);
            }

            let attempt = run.retry.attempt;
            if attempt == 0 {
                info!(tiles = pending.len(), "Starting initial download");
            } else {
                warn!(
                    tiles = pending.len(),
                    attempt = attempt,
                    max_retries = max_retries,
                    "Tiles still missing or zero-byte, retrying download"
                );
            }

            let (stats, misses) = self.dispatch(&pending, attempt, observer);
            run.stats += stats;
            run.permanent_misses.extend(misses);
            run.dispatches += 1;

            if self.cancel.is_cancelled() {
                return self.cancelled(run);
            }

            let mut waited = Duration::ZERO;
            if attempt < max_retries {
                let delay = self.config.retry.backoff_for(attempt);
                if !delay.is_zero() {
                    info!(delay_ms = delay.as_millis() as u64, "Backing off before next attempt");
                    if self.cancel.sleep(delay) {
                        return self.cancelled(run);
                    }
                }
                waited = delay;
            }
            run.retry.advance(waited);
        }
    }

    /// Fetch `tiles` on the worker pool and block until all are done.
    ///
    /// Returns the batch counts and the tiles that came back 404.
    fn dispatch(
        &self,
        tiles: &[TileCoord],
        attempt: u32,
        observer: &dyn ProgressObserver,
    ) -> (BatchStats, Vec<TileCoord>) {
        observer.batch_started(attempt, tiles.len());
        let counters = BatchCounters::new(tiles.len());

        let misses: Vec<TileCoord> = self.pool.install(|| {
            tiles
                .par_iter()
                .filter_map(|coord| {
                    if self.cancel.is_cancelled() {
                        counters.record_skipped();
                        return None;
                    }
                    let outcome = self.fetcher.fetch(coord);
                    counters.record(&outcome);
                    observer.tile_completed(coord, &outcome);
                    outcome.is_permanent_miss().then_some(*coord)
                })
                .collect()
        });

        let stats = counters.snapshot();
        info!(
            attempt = attempt,
            succeeded = stats.succeeded,
            not_found = stats.permanent_misses,
            failed = stats.transient_failures,
            skipped = stats.skipped,
            "Batch finished"
        );
        observer.batch_finished(attempt, &stats);

        (stats, misses)
    }

    fn exhausted(&self, run: RunState) -> DownloadReport {
        let unresolved = run.unresolved_with_reasons();
        error!(
            tiles = unresolved.len(),
            attempts = run.dispatches,
            "Download failed: tiles remain missing or zero-byte after retries"
        );

        let limit = self.config.unresolved_log_limit;
        for (coord, reason) in unresolved.iter().take(limit) {
            error!(
                z = coord.zoom,
                x = coord.x,
                y = coord.y,
                reason = reason.as_str(),
                "Unresolved tile after retries"
            );
        }
        if unresolved.len() > limit {
            error!(
                omitted = unresolved.len() - limit,
                "Further unresolved tiles not listed"
            );
        }

        run.finish(RunOutcome::Exhausted)
    }

    fn cancelled(&self, run: RunState) -> DownloadReport {
        warn!(
            attempts = run.dispatches,
            "Download cancelled; completed tiles are kept and will be skipped next run"
        );
        run.finish(RunOutcome::Cancelled)
    }
}

/// Why a tile is still unresolved when a run gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnresolvedReason {
    /// The server answered 404 during this run.
    NotFound,
    /// A file was present but empty or unreadable.
    ZeroByte,
    Missing,
}

impl UnresolvedReason {
    fn as_str(self) -> &'static str {
        match self {
            UnresolvedReason::NotFound => "not found",
            UnresolvedReason::ZeroByte => "zero-byte",
            UnresolvedReason::Missing => "missing",
        }
    }
}

/// Mutable bookkeeping for one run.
struct RunState {
    expected: usize,
    retry: RetryState,
    dispatches: u32,
    /// Latest verification pass.
    verification: VerifyReport,
    permanent_misses: BTreeSet<TileCoord>,
    stats: BatchStats,
}

impl RunState {
    fn new(expected: usize) -> Self {
        Self {
            expected,
            retry: RetryState::default(),
            dispatches: 0,
            verification: VerifyReport::default(),
            permanent_misses: BTreeSet::new(),
            stats: BatchStats::default(),
        }
    }

    /// Unresolved tiles from the latest verification, missing first.
    fn unresolved_with_reasons(&self) -> Vec<(TileCoord, UnresolvedReason)> {
        let missing = self.verification.missing.iter().map(|c| (*c, UnresolvedReason::Missing));
        let zero = self.verification.zero.iter().map(|c| (*c, UnresolvedReason::ZeroByte));
        missing
            .chain(zero)
            .map(|(coord, reason)| {
                if self.permanent_misses.contains(&coord) {
                    (coord, UnresolvedReason::NotFound)
                } else {
                    (coord, reason)
                }
            })
            .collect()
    }

    fn finish(self, outcome: RunOutcome) -> DownloadReport {
        let unresolved = if outcome == RunOutcome::Done {
            Vec::new()
        } else {
            self.verification.unresolved()
        };
        DownloadReport {
            outcome,
            expected_tiles: self.expected,
            attempts: self.dispatches,
            unresolved,
            permanent_misses: self.permanent_misses.into_iter().collect(),
            stats: self.stats,
            total_backoff: self.retry.accumulated_backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TileCodec;
    use crate::config::ApiKey;
    use crate::fetcher::DownloadOutcome;
    use crate::provider::{HttpResponse, MockHttpClient, ProviderError, ScriptedHttpClient, TileEndpoint};
    use crate::store::TileLayout;
    use parking_lot::Mutex;
    use std::fs;
    use std::io;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fetcher<C: HttpClient>(dir: &TempDir, client: C) -> TileFetcher<C> {
        TileFetcher::new(
            client,
            TileEndpoint::new(
                "http://tiles.test",
                "atlas",
                ApiKey::new("0123456789abcdef0123456789").unwrap(),
            ),
            TileStore::new(TileLayout::new(dir.path(), "thunderforest", "atlas")),
            TileCodec::new(100),
        )
    }

    fn config(max_retries: u32) -> EngineConfig {
        EngineConfig::default()
            .with_workers(4)
            .with_retry_policy(BatchRetryPolicy::immediate(max_retries))
    }

    fn png(body: &[u8]) -> Result<HttpResponse, ProviderError> {
        Ok(HttpResponse::new(200, body.to_vec()).with_content_type("image/png"))
    }

    fn tiles() -> Vec<TileCoord> {
        vec![
            TileCoord::new(2, 1, 1),
            TileCoord::new(2, 1, 2),
            TileCoord::new(2, 2, 1),
        ]
    }

    #[derive(Default)]
    struct RecordingObserver {
        batches: Mutex<Vec<(u32, usize)>>,
        completed: Mutex<usize>,
    }

    impl ProgressObserver for RecordingObserver {
        fn batch_started(&self, attempt: u32, tiles: usize) {
            self.batches.lock().push((attempt, tiles));
        }

        fn tile_completed(&self, _coord: &TileCoord, _outcome: &DownloadOutcome) {
            *self.completed.lock() += 1;
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = TempDir::new().unwrap();
        let result = DownloadEngine::new(
            fetcher(&dir, MockHttpClient::new(png(b"x"))),
            config(0).with_workers(0),
        );
        assert!(matches!(result, Err(EngineError::NoWorkers)));
    }

    #[test]
    fn test_all_tiles_downloaded_in_one_attempt() {
        let dir = TempDir::new().unwrap();
        let engine =
            DownloadEngine::new(fetcher(&dir, MockHttpClient::new(png(b"tile"))), config(3))
                .unwrap();
        let observer = RecordingObserver::default();

        let report = engine.run_tiles(&tiles(), &observer);

        assert_eq!(report.outcome, RunOutcome::Done);
        assert_eq!(report.attempts, 1);
        assert_eq!(report.stats.succeeded, 3);
        assert!(report.unresolved.is_empty());
        assert_eq!(*observer.batches.lock(), vec![(0, 3)]);
        assert_eq!(*observer.completed.lock(), 3);
    }

    #[test]
    fn test_empty_tile_set_makes_no_requests() {
        let dir = TempDir::new().unwrap();
        let engine =
            DownloadEngine::new(fetcher(&dir, MockHttpClient::new(png(b"tile"))), config(3))
                .unwrap();

        let report = engine.run_tiles(&[], &NoopObserver);

        assert_eq!(report.outcome, RunOutcome::Done);
        assert_eq!(report.attempts, 0);
        assert_eq!(engine.fetcher().client().calls(), 0);
    }

    #[test]
    fn test_existing_tiles_not_refetched() {
        let dir = TempDir::new().unwrap();
        let engine =
            DownloadEngine::new(fetcher(&dir, MockHttpClient::new(png(b"tile"))), config(3))
                .unwrap();
        for coord in tiles() {
            let path = engine.store().ensure_parent(&coord).unwrap();
            fs::write(path, b"cached").unwrap();
        }

        let report = engine.run_tiles(&tiles(), &NoopObserver);

        assert!(report.is_success());
        assert_eq!(report.attempts, 0);
        assert_eq!(engine.fetcher().client().calls(), 0);
    }

    #[test]
    fn test_transient_failures_recover_on_retry() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedHttpClient::new(vec![
            Ok(HttpResponse::new(500, Vec::new())),
            Ok(HttpResponse::new(500, Vec::new())),
            Ok(HttpResponse::new(500, Vec::new())),
            png(b"tile"),
        ]);
        let engine = DownloadEngine::new(fetcher(&dir, client), config(5)).unwrap();

        let report = engine.run_tiles(&tiles(), &NoopObserver);

        assert_eq!(report.outcome, RunOutcome::Done);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.stats.transient_failures, 3);
        assert_eq!(report.stats.succeeded, 3);
    }

    #[test]
    fn test_exhausted_after_ceiling() {
        let dir = TempDir::new().unwrap();
        let engine = DownloadEngine::new(
            fetcher(&dir, MockHttpClient::new(Ok(HttpResponse::new(500, Vec::new())))),
            config(2),
        )
        .unwrap();
        let only = [TileCoord::new(1, 0, 1)];

        let report = engine.run_tiles(&only, &NoopObserver);

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.unresolved, only.to_vec());
        assert_eq!(engine.fetcher().client().calls(), 3);
    }

    /// Run `f` with `tracing` output captured as plain text.
    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || LogSink(Arc::clone(&sink)))
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(buf.lock().clone()).unwrap();
        (result, text)
    }

    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogSink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn unresolved_lines(logs: &str) -> Vec<&str> {
        logs.lines()
            .filter(|l| l.contains("Unresolved tile after retries"))
            .collect()
    }

    #[test]
    fn test_exhausted_logs_exactly_the_unresolved_tile() {
        let dir = TempDir::new().unwrap();
        let engine = DownloadEngine::new(
            fetcher(&dir, MockHttpClient::new(Ok(HttpResponse::new(500, Vec::new())))),
            config(1),
        )
        .unwrap();

        let (report, logs) =
            capture_logs(|| engine.run_tiles(&[TileCoord::new(10, 301, 384)], &NoopObserver));

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        let lines = unresolved_lines(&logs);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("z=10 x=301 y=384"));
        assert!(lines[0].contains("reason=\"missing\""));
        assert!(!logs.contains("Further unresolved tiles not listed"));
    }

    #[test]
    fn test_unresolved_log_is_truncated_at_limit() {
        let dir = TempDir::new().unwrap();
        let engine = DownloadEngine::new(
            fetcher(&dir, MockHttpClient::new(Ok(HttpResponse::new(500, Vec::new())))),
            EngineConfig {
                unresolved_log_limit: 1,
                ..config(0)
            },
        )
        .unwrap();

        let (report, logs) = capture_logs(|| engine.run_tiles(&tiles(), &NoopObserver));

        assert_eq!(report.unresolved.len(), 3);
        assert_eq!(unresolved_lines(&logs).len(), 1);
        assert!(logs.contains("omitted=2"));
    }

    /// Leaves an empty file behind for every tile the engine completes.
    struct EmptyFileObserver {
        store: TileStore,
    }

    impl ProgressObserver for EmptyFileObserver {
        fn tile_completed(&self, coord: &TileCoord, _outcome: &DownloadOutcome) {
            let path = self.store.ensure_parent(coord).unwrap();
            fs::write(path, b"").unwrap();
        }
    }

    #[test]
    fn test_exhausted_reports_zero_byte_and_not_found_reasons() {
        let dir = TempDir::new().unwrap();
        let zero = TileCoord::new(2, 1, 1);
        let not_found = TileCoord::new(2, 2, 2);
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::new(500, Vec::new()))]);
        let engine = DownloadEngine::new(fetcher(&dir, client), config(0)).unwrap();
        let observer = EmptyFileObserver {
            store: engine.store().clone(),
        };

        let mut run = RunState::new(2);
        run.verification = VerifyReport {
            missing: vec![not_found],
            zero: vec![zero],
        };
        run.permanent_misses.insert(not_found);
        assert_eq!(
            run.unresolved_with_reasons(),
            vec![
                (not_found, UnresolvedReason::NotFound),
                (zero, UnresolvedReason::ZeroByte)
            ]
        );

        // End to end: the empty file written after the last fetch is
        // classified zero-byte by the final verification.
        let (report, logs) = capture_logs(|| engine.run_tiles(&[zero], &observer));
        assert_eq!(report.outcome, RunOutcome::Exhausted);
        let lines = unresolved_lines(&logs);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("reason=\"zero-byte\""));
    }

    #[test]
    fn test_permanent_misses_are_skipped() {
        let dir = TempDir::new().unwrap();
        let engine = DownloadEngine::new(
            fetcher(&dir, MockHttpClient::new(Ok(HttpResponse::new(404, Vec::new())))),
            config(10),
        )
        .unwrap();
        let only = [TileCoord::new(1, 1, 1)];

        let report = engine.run_tiles(&only, &NoopObserver);

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(report.attempts, 1);
        assert_eq!(report.permanent_misses, only.to_vec());
        assert_eq!(engine.fetcher().client().calls(), 1);
    }

    #[test]
    fn test_permanent_misses_retried_when_not_skipping() {
        let dir = TempDir::new().unwrap();
        let engine = DownloadEngine::new(
            fetcher(&dir, MockHttpClient::new(Ok(HttpResponse::new(404, Vec::new())))),
            config(3).with_skip_permanent_misses(false),
        )
        .unwrap();

        let report = engine.run_tiles(&[TileCoord::new(1, 1, 1)], &NoopObserver);

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(report.attempts, 4);
        assert_eq!(engine.fetcher().client().calls(), 4);
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let engine =
            DownloadEngine::new(fetcher(&dir, MockHttpClient::new(png(b"tile"))), config(3))
                .unwrap()
                .with_cancellation(cancel);

        let report = engine.run_tiles(&tiles(), &NoopObserver);

        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert_eq!(engine.fetcher().client().calls(), 0);
    }

    #[test]
    fn test_backoff_accumulates() {
        let dir = TempDir::new().unwrap();
        let policy = BatchRetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_exponent: 5,
            jitter: Duration::ZERO,
        };
        let engine = DownloadEngine::new(
            fetcher(&dir, MockHttpClient::new(Ok(HttpResponse::new(503, Vec::new())))),
            config(0).with_retry_policy(policy),
        )
        .unwrap();

        let report = engine.run_tiles(&[TileCoord::new(0, 0, 0)], &NoopObserver);

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        // Waits after attempts 0 and 1 only: 1ms + 2ms
        assert_eq!(report.total_backoff, Duration::from_millis(3));
    }
}
