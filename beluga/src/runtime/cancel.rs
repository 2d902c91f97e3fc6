use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Token for signaling batch cancellation.
///
/// Cancelling stops the driver from admitting queued jobs and signals
/// in-flight worker adapters, which kill their processes best-effort.
/// Cancellation is sticky: a cancelled token never resets, so an
/// orchestrator instance serves at most one batch meaningfully after
/// `cancel` has been called.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<CancelTokenInner>,
}

#[derive(Debug)]
struct CancelTokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelTokenInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancelled.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before re-checking the flag so a cancel landing between
        // the check and the wait cannot be missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_cancel_visible_to_all_clones() {
        let token = CancelToken::new();
        let clone1 = token.clone();
        let clone2 = token.clone();

        token.cancel();

        assert!(clone1.is_cancelled());
        assert!(clone2.is_cancelled());

        // cancelled() should return immediately, not hang
        timeout(Duration::from_secs(1), clone1.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiting_clones() {
        let token = CancelToken::new();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let clone = token.clone();
                tokio::spawn(async move { clone.cancelled().await })
            })
            .collect();

        // Give waiters time to register
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        for handle in waiters {
            timeout(Duration::from_secs(5), handle)
                .await
                .expect("waiter did not observe cancellation")
                .expect("waiter task panicked");
        }
    }

    #[tokio::test]
    async fn test_default_not_cancelled() {
        let token = CancelToken::default();
        assert!(!token.is_cancelled());
    }
}
