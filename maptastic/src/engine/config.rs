//! Engine configuration and the batch-level retry policy.

use std::time::Duration;

/// Default number of concurrent fetch workers.
pub const DEFAULT_WORKERS: usize = 96;

/// Default number of macro retries after the initial dispatch.
pub const DEFAULT_BATCH_RETRIES: u32 = 50;

/// Default cap on unresolved tiles listed in the failure log.
pub const DEFAULT_UNRESOLVED_LOG_LIMIT: usize = 5000;

/// Backoff between whole-batch attempts.
///
/// The wait after attempt `n` is
/// `min(max_delay, base_delay * 2^min(n, max_exponent)) + jitter * n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRetryPolicy {
    /// Dispatches after the initial one before giving up.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_exponent: u32,
    /// Linear term scaled by the attempt number.
    pub jitter: Duration,
}

impl Default for BatchRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_BATCH_RETRIES,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_exponent: 5,
            jitter: Duration::from_millis(250),
        }
    }
}

impl BatchRetryPolicy {
    /// Same ceiling, no waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_exponent: 0,
            jitter: Duration::ZERO,
        }
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(self.max_exponent).min(31);
        let exponential = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        exponential.saturating_add(self.jitter.saturating_mul(attempt))
    }
}

/// Immutable settings for one [`DownloadEngine`](super::DownloadEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum in-flight fetches.
    pub workers: usize,
    pub retry: BatchRetryPolicy,
    pub unresolved_log_limit: usize,
    /// Stop re-dispatching tiles that returned 404 earlier in the run.
    pub skip_permanent_misses: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            retry: BatchRetryPolicy::default(),
            unresolved_log_limit: DEFAULT_UNRESOLVED_LOG_LIMIT,
            skip_permanent_misses: true,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_retry_policy(mut self, retry: BatchRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_skip_permanent_misses(mut self, skip: bool) -> Self {
        self.skip_permanent_misses = skip;
        self
    }
}

/// Engine-level retry counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Index of the next dispatch; 0 is the initial download.
    pub attempt: u32,
    /// Total time spent sleeping between attempts.
    pub accumulated_backoff: Duration,
}

impl RetryState {
    /// Record a completed wait and move to the next attempt.
    pub fn advance(&mut self, waited: Duration) {
        self.accumulated_backoff += waited;
        self.attempt += 1;
    }
}
