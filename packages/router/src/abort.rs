//! Cooperative Cancellation
//!
//! Each navigation owns an `AbortController`; its cloneable `AbortSignal` is
//! threaded through guard/resolver/loader evaluation. Cancellation is
//! cooperative: long-running work is raced against `cancelled()`, never
//! interrupted forcibly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct AbortInner {
    aborted: AtomicBool,
    notify: Notify,
}

/// The owning side; firing it is idempotent.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    inner: Arc<AbortInner>,
}

impl AbortController {
    pub fn new() -> Self {
        AbortController::default()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            inner: self.inner.clone(),
        }
    }

    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }
}

/// The observing side, cloneable and cheap to pass down the pipeline.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    inner: Arc<AbortInner>,
}

impl AbortSignal {
    pub fn aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once the controller fires. Resolves immediately when it
    /// already has.
    pub async fn cancelled(&self) {
        while !self.aborted() {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register with the Notify before re-checking, so an abort
            // landing in between still wakes us.
            notified.as_mut().enable();
            if self.aborted() {
                return;
            }
            notified.await;
        }
    }
}
