//! Cooperative cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Shared cancellation signal.
///
/// Clones observe the same flag. Setting it stops new fetches from being
/// started and wakes any [`sleep`](Self::sleep) in progress.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (lock, cond) = &*self.inner;
        *lock.lock() = true;
        cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the sleep ended because of cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (lock, cond) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut cancelled = lock.lock();

        while !*cancelled {
            if cond.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}
