//! Per-call cancellation.

use tokio::sync::watch;

/// Cancellation signal observed by a streaming handler.
///
/// Cancelled when [`CancelHandle::cancel`] is called or when the handle is
/// dropped, so a transport only has to keep the handle alive while the
/// client is connected.
#[derive(Clone)]
pub struct CallContext {
    cancel: watch::Receiver<bool>,
}

/// Owner side of a [`CallContext`].
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CallContext {
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel: rx }, CancelHandle { tx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.cancel.has_changed().is_err()
    }

    /// Resolves once the call is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (ctx, handle) = CallContext::new();
        assert!(!ctx.is_cancelled());

        let waiter = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.cancelled().await }
        });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_handle_cancels() {
        let (ctx, handle) = CallContext::new();
        drop(handle);

        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .unwrap();
        assert!(ctx.is_cancelled());
    }
}
