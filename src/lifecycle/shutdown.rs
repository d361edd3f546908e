//! Shutdown coordination for the relay.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Wraps a watch channel that the accept loop and every connection handler
/// subscribe to, replacing a bare shared running flag: the shutdown
/// dependency is visible at each call site that holds a receiver.
///
/// Triggering is idempotent. The state transitions Running → ShuttingDown
/// exactly once; a second termination request while shutdown is in
/// progress is a no-op.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
    triggered: AtomicBool,
}

impl Shutdown {
    /// Create a new shutdown coordinator in the Running state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx, triggered: AtomicBool::new(false) }
    }

    /// Subscribe to the shutdown signal.
    ///
    /// A receiver obtained after the trigger still observes the signalled
    /// state immediately.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Request shutdown. Returns `true` only for the first request.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.tx.send(true);
        true
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_observe_trigger() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        assert!(!*rx.borrow());
        assert!(shutdown.trigger());
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn late_subscriber_sees_signalled_state() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut rx = shutdown.subscribe();
        // wait_for resolves immediately on an already-signalled channel.
        rx.wait_for(|stop| *stop).await.unwrap();
    }

    #[test]
    fn second_trigger_is_noop() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());
        assert!(shutdown.is_triggered());
    }
}
