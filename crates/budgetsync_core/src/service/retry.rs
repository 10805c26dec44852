//! Bounded retry with exponential backoff for storage lock contention.
//!
//! # Invariants
//! - Only `RepoError::is_busy()` failures are retried.
//! - The operation runs at most `max_attempts` times.

use crate::repo::file_repo::RepoResult;
use log::warn;
use std::thread;
use std::time::Duration;

/// Retry budget for busy/locked database conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Backoff to sleep after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

/// Runs `op`, retrying busy failures according to `policy`.
pub fn retry_on_busy<T>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: impl FnMut() -> RepoResult<T>,
) -> RepoResult<T> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(err) if err.is_busy() && attempt < max_attempts => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    "event=storage_busy module=service status=retry operation={} attempt={} backoff_ms={}",
                    operation,
                    attempt,
                    backoff.as_millis()
                );
                thread::sleep(backoff);
                attempt += 1;
            }
            result => return result,
        }
    }
}
