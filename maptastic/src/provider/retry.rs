//! Request-level retry for single tile requests.
//!
//! [`RetryingClient`] wraps any [`HttpClient`] and retries one URL on
//! transport failures and on retryable HTTP statuses. It knows nothing about
//! tiles or batches; whole-batch convergence is the engine's job and runs
//! under its own, separately configured policy.

use std::time::Duration;

use tracing::debug;

use super::http::HttpClient;
use crate::engine::CancellationFlag;
use super::types::{HttpResponse, ProviderError};

/// Default total retries per request.
pub const DEFAULT_REQUEST_RETRIES: u32 = 8;

/// Default retries spent on transport failures (connect/read).
pub const DEFAULT_TRANSPORT_RETRIES: u32 = 6;

/// Default backoff factor; the n-th retry waits `factor * 2^(n-1)`.
pub const DEFAULT_BACKOFF_FACTOR: Duration = Duration::from_millis(500);

/// Default ceiling for any single retry delay, including `Retry-After`.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Statuses worth retrying: rate limiting, server and gateway errors
/// (including the Cloudflare 52x family).
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 8] = [429, 500, 502, 503, 504, 520, 522, 524];

/// Retry policy for a single HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRetryPolicy {
    /// Total retries across all failure kinds.
    pub max_retries: u32,
    /// Retries allowed for transport failures; bounded by `max_retries`.
    pub max_transport_retries: u32,
    /// Base of the exponential backoff.
    pub backoff_factor: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Statuses that trigger a retry.
    pub retryable_statuses: Vec<u16>,
    /// Prefer the server's `Retry-After` hint over computed backoff.
    pub respect_retry_after: bool,
}

impl Default for RequestRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_REQUEST_RETRIES,
            max_transport_retries: DEFAULT_TRANSPORT_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_backoff: DEFAULT_MAX_BACKOFF,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
            respect_retry_after: true,
        }
    }
}

impl RequestRetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            max_transport_retries: 0,
            ..Self::default()
        }
    }

    /// Set the total retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff factor.
    pub fn with_backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay before the `retry`-th retry (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(16);
        self.backoff_factor
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    fn delay_for(&self, retry: u32, response: Option<&HttpResponse>) -> Duration {
        let hinted = response
            .filter(|_| self.respect_retry_after)
            .and_then(|r| r.retry_after);
        match hinted {
            Some(delay) => delay.min(self.max_backoff),
            None => self.backoff_for(retry),
        }
    }
}

/// [`HttpClient`] decorator applying a [`RequestRetryPolicy`].
///
/// After the budget is spent the last response (or transport error) is
/// returned unchanged, so callers still see the final status. Cancelling
/// the attached [`CancellationFlag`] cuts any pending retry short the same
/// way.
pub struct RetryingClient<C: HttpClient> {
    inner: C,
    policy: RequestRetryPolicy,
    cancel: CancellationFlag,
}

impl<C: HttpClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RequestRetryPolicy) -> Self {
        Self {
            inner,
            policy,
            cancel: CancellationFlag::new(),
        }
    }

    /// Stop retrying once `cancel` is set.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: HttpClient> HttpClient for RetryingClient<C> {
    fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        let mut retries = 0u32;
        let mut transport_retries = 0u32;

        loop {
            let result = self.inner.get(url);
            if retries >= self.policy.max_retries {
                return result;
            }

            let delay = match &result {
                Ok(response) if self.policy.is_retryable_status(response.status) => {
                    let delay = self.policy.delay_for(retries + 1, Some(response));
                    debug!(
                        status = response.status,
                        retry = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable status, retrying request"
                    );
                    delay
                }
                Ok(_) => return result,
                Err(e) if transport_retries < self.policy.max_transport_retries => {
                    transport_retries += 1;
                    let delay = self.policy.delay_for(retries + 1, None);
                    debug!(
                        error = %e,
                        retry = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Transport failure, retrying request"
                    );
                    delay
                }
                Err(_) => return result,
            };
            retries += 1;

            if self.cancel.sleep(delay) {
                debug!(retry = retries, "Request retry abandoned after cancellation");
                return result;
            }
        }
    }
}
