//! Cooperative cancellation tokens.
//!
//! Provides a lightweight [`CancelToken`] shared across pipeline tasks to
//! request early termination. Cancellation is cooperative: pipelines check
//! the token at every suspension point and stop consuming further events;
//! already-issued network requests are abandoned, not revoked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cloneable handle signalling cancellation across async tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    is_cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Notifies all waiters exactly once; subsequent
    /// calls are no-ops.
    pub fn cancel(&self) {
        if !self.inner.is_cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested. Returns immediately if already
    /// cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.inner.notify.notified();
        // Re-check after registering to close the race with cancel()
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
