//! Global pacing gate for outbound API calls.
//!
//! DESIGN
//! ======
//! One process-wide `last_request_at` timestamp. `acquire` sleeps until
//! `min_delay` has passed since the last recorded call, then records now.
//! Explanation and follow-up requests share the same gate.
//!
//! TRADE-OFFS
//! ==========
//! The lock guards only the read and the write, never the sleep. Two callers
//! arriving together can both read the same stale timestamp and both proceed
//! after the same delay. This is best-effort pacing, not admission control.
//! The limiter never looks at API responses, so a 429 gets no extra backoff.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(1000);

#[derive(Clone)]
pub struct RateLimiter {
    last_request_at: Arc<Mutex<Option<Instant>>>,
    min_delay: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_delay: Duration) -> Self {
        Self { last_request_at: Arc::new(Mutex::new(None)), min_delay }
    }

    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait until the next call may be dispatched, then record it.
    ///
    /// Returns how long the caller was suspended.
    pub async fn acquire(&self) -> Duration {
        let wait = self.wait_for(Instant::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.record(Instant::now());
        wait
    }

    /// Time remaining before a call at `now` may proceed.
    fn wait_for(&self, now: Instant) -> Duration {
        let last = *self
            .last_request_at
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(last) = last else {
            return Duration::ZERO;
        };
        self.min_delay
            .saturating_sub(now.saturating_duration_since(last))
    }

    fn record(&self, now: Instant) {
        *self
            .last_request_at
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(now);
    }

    /// Timestamp of the last dispatched call, if any.
    #[must_use]
    pub fn last_request_at(&self) -> Option<Instant> {
        *self
            .last_request_at
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY)
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
