//! Cancellation token for cooperative cancellation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// A level-triggered token for cooperative cancellation.
///
/// Once cancelled the token stays cancelled until [`reset`](Self::reset).
/// Cancellation is idempotent - only the first cancellation reason is kept.
#[derive(Default)]
pub struct CancellationToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Wakes observers waiting in [`cancelled`](Self::cancelled).
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
            self.notify.notify_waiters();
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Clears the flag and reason so the token can be reused for a new run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
        *self.reason.write() = None;
    }

    /// Resolves once cancellation has been observed.
    ///
    /// The flag is re-checked at least every `poll_interval`; a call to
    /// [`cancel`](Self::cancel) also wakes the waiter immediately.
    pub async fn cancelled(&self, poll_interval: Duration) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }

            tokio::select! {
                () = notified => {}
                () = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
