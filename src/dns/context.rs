//! Deadline and cancellation signal carried through a query.
//!
//! A `QueryContext` is observed at every suspension point of a query: the
//! wire exchange, the TLS handshake, the HTTP round trip and the retry
//! backoff sleep. Cancellation is delivered through a `watch` channel, the
//! same way long-running tasks receive their shutdown signal.

use crate::dns::DnsError;
use std::future::{pending, Future};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::{sleep_until, Instant};

/// A caller-supplied deadline and/or cancellation signal.
///
/// Cloning is cheap; every clone observes the same deadline and signal.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    deadline: Option<Instant>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

/// Fires the cancellation signal of the contexts created alongside it.
#[derive(Debug)]
pub struct CancelHandle {
    cancel_tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancels every query observing the paired context.
    pub fn cancel(&self) {
        // send_replace never fails, even with no receivers left.
        self.cancel_tx.send_replace(true);
    }
}

impl QueryContext {
    /// A context that never expires and is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context expiring `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    /// A context that can be cancelled through the returned handle.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (Self::background().cancelled_by(cancel_rx), CancelHandle { cancel_tx })
    }

    /// Bounds this context by `deadline`, keeping an earlier deadline if one exists.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Ties this context to a cancellation channel. `true` on the channel cancels.
    pub fn cancelled_by(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The deadline for a single attempt: `timeout` from now, capped by the
    /// context deadline.
    pub fn attempt_deadline(&self, timeout: Duration) -> Instant {
        let attempt = Instant::now() + timeout;
        match self.deadline {
            Some(deadline) => deadline.min(attempt),
            None => attempt,
        }
    }

    /// Returns the cancellation error if the context has already fired.
    pub fn err(&self) -> Option<DnsError> {
        if let Some(rx) = &self.cancel_rx {
            if *rx.borrow() {
                return Some(DnsError::Cancelled);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DnsError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> DnsError {
        let cancelled = async {
            match self.cancel_rx.clone() {
                Some(mut rx) => loop {
                    if *rx.borrow_and_update() {
                        return;
                    }
                    if rx.changed().await.is_err() {
                        // Handle dropped without cancelling: never fires.
                        pending::<()>().await;
                    }
                },
                None => pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => DnsError::Cancelled,
            _ = expired => DnsError::DeadlineExceeded,
        }
    }

    /// Races `fut` against this context. The context wins ties.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, DnsError>
    where
        F: Future<Output = Result<T, DnsError>>,
    {
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            result = fut => result,
        }
    }

    /// Runs `fut` on its own task and races its single-slot result channel
    /// against this context.
    ///
    /// The spawned task owns every resource `fut` opens and releases them on
    /// its own exit path. If the context wins, the task is left to finish on
    /// its own, so `fut` must bound itself with a deadline.
    pub async fn run_detached<T, F>(&self, fut: F) -> Result<T, DnsError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, DnsError>> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = result_tx.send(fut.await);
        });

        tokio::select! {
            biased;
            err = self.done() => Err(err),
            received = result_rx => received.unwrap_or_else(|_| {
                Err(DnsError::Transport("exchange task terminated without a result".to_string()))
            }),
        }
    }
}
