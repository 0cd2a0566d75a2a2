use std::sync::Arc;
use tokio::sync::watch;

/// Shared stop flag observed by every producer, worker and consumer.
///
/// Raising it only prevents new work; requests already in flight run until
/// they complete or time out.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only returns after a cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());

        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake up")
            .unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_raised() {
        let signal = CancelSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("already cancelled");
    }
}
