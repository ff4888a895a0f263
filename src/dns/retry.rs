//! Bounded retries with linear backoff.

use crate::dns::{context::QueryContext, DnsError};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Backoff grows by this step per attempt: 100ms, 200ms, 300ms, ...
pub const BACKOFF_STEP: Duration = Duration::from_millis(100);

/// Retry settings for a single-server query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one fails.
    pub retries: u32,
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self { retries }
    }

    /// The wait before retry number `attempt` (1-based).
    pub fn backoff(attempt: u32) -> Duration {
        BACKOFF_STEP * attempt
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or `retries + 1` attempts have been made.
    ///
    /// The operation receives the zero-based attempt index. On exhaustion the
    /// error of the last attempt is returned; earlier errors are discarded.
    /// If `ctx` fires during a backoff wait the cancellation error is
    /// returned instead.
    pub async fn run<T, F, Fut>(&self, ctx: &QueryContext, mut operation: F) -> Result<T, DnsError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, DnsError>>,
    {
        let mut attempt = 0;
        loop {
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= self.retries {
                return Err(err);
            }

            attempt += 1;
            let backoff = Self::backoff(attempt);
            metrics::counter!("dns_retry_attempts_total").increment(1);
            debug!(attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "Retrying after backoff");

            tokio::select! {
                biased;
                cancelled = ctx.done() => return Err(cancelled),
                _ = sleep(backoff) => {}
            }
        }
    }
}
