//! Deadline and cancellation propagation.
//!
//! A [`CallContext`] travels down the call chain with every lookup. It
//! carries an absolute deadline and a cancellation token; callees may
//! narrow the deadline but never extend it.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Why a context stopped an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    DeadlineExceeded,
    Cancelled,
}

/// Deadline plus cooperative cancellation for one request.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl CallContext {
    /// A fresh context expiring `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// A child context whose deadline is the earlier of the parent's and
    /// `timeout` from now. Cancelling the parent cancels the child.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self {
            deadline: self.deadline.min(Instant::now() + timeout),
            cancel: self.cancel.child_token(),
        }
    }

    #[cfg(test)]
    fn deadline(&self) -> Instant {
        self.deadline
    }

    #[cfg(test)]
    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    #[cfg(test)]
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    #[cfg(test)]
    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels this context when the returned guard is dropped.
    ///
    /// Held by the request handler so that an abandoned request (client
    /// disconnect, outer timeout) aborts whatever is running below it.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    /// Resolves when the deadline passes or the context is cancelled.
    pub async fn interrupted(&self) -> Interrupted {
        tokio::select! {
            _ = tokio::time::sleep_until(self.deadline) => Interrupted::DeadlineExceeded,
            _ = self.cancel.cancelled() => Interrupted::Cancelled,
        }
    }
}
