//! Broadcast fan-out.
//!
//! # Responsibilities
//! - Deliver one payload to every registered client except the sender
//! - Isolate per-peer delivery failures from each other and from the sender
//!
//! # Design Decisions
//! - Fan-out runs on a lock-held snapshot, not under the registry lock, so
//!   one slow peer cannot stall other deliveries or registry mutation
//! - Delivery is best-effort: a peer with a full queue loses that payload,
//!   a peer with a closed queue is evicted from the registry

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use crate::net::connection::ConnectionId;
use crate::observability::metrics;
use crate::registry::ClientRegistry;

/// Outcome of one broadcast, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// Peers whose queue accepted the payload.
    pub delivered: usize,
    /// Peers skipped because their queue was full or closed.
    pub failed: usize,
}

/// Fans payloads out to all registry members except the sender.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ClientRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Broadcast `payload` to every client except `sender`.
    ///
    /// Per-peer failures are logged and counted individually; they never
    /// abort delivery to the remaining peers and never surface as an error
    /// to the sender's receive loop.
    pub fn dispatch(&self, payload: &[u8], sender: ConnectionId) -> DispatchOutcome {
        let peers = self.registry.snapshot_except(sender);
        let mut outcome = DispatchOutcome::default();

        for peer in &peers {
            match peer.try_deliver(payload.to_vec()) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    outcome.failed += 1;
                    metrics::record_send_failure("queue_full");
                    tracing::warn!(
                        connection_id = %peer.id(),
                        peer_addr = %peer.peer_addr(),
                        "Outbound queue full, payload dropped for this peer"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    outcome.failed += 1;
                    metrics::record_send_failure("queue_closed");
                    tracing::debug!(
                        connection_id = %peer.id(),
                        peer_addr = %peer.peer_addr(),
                        "Peer queue closed mid-broadcast, evicting"
                    );
                    // The peer's writer is gone; its handler will deregister
                    // anyway, but evicting now keeps later fan-outs tight.
                    self.registry.remove(peer.id());
                }
            }
        }

        metrics::record_broadcast(payload.len(), outcome.delivered);
        tracing::trace!(
            sender = %sender,
            bytes = payload.len(),
            delivered = outcome.delivered,
            failed = outcome.failed,
            "Broadcast dispatched"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::ClientHandle;
    use tokio::sync::mpsc;

    fn registered(registry: &ClientRegistry, port: u16, depth: usize) -> (ConnectionId, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(depth);
        let addr = format!("127.0.0.1:{port}").parse().unwrap();
        let handle = ClientHandle::new(ConnectionId::new(), addr, tx);
        let id = handle.id();
        registry.add(handle);
        (id, rx)
    }

    #[tokio::test]
    async fn delivers_to_everyone_but_sender() {
        let registry = Arc::new(ClientRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));

        let (a, mut rx_a) = registered(&registry, 7000, 8);
        let (_b, mut rx_b) = registered(&registry, 7001, 8);
        let (_c, mut rx_c) = registered(&registry, 7002, 8);

        let outcome = dispatcher.dispatch(b"hello", a);
        assert_eq!(outcome, DispatchOutcome { delivered: 2, failed: 0 });

        assert_eq!(rx_b.recv().await.unwrap(), b"hello".to_vec());
        assert_eq!(rx_c.recv().await.unwrap(), b"hello".to_vec());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn one_full_peer_does_not_block_the_rest() {
        let registry = Arc::new(ClientRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));

        let (sender, _rx_sender) = registered(&registry, 7010, 8);
        let (_slow, _rx_slow) = registered(&registry, 7011, 1);
        let (_ok, mut rx_ok) = registered(&registry, 7012, 8);

        // First dispatch fills the slow peer's depth-1 queue.
        dispatcher.dispatch(b"one", sender);
        let outcome = dispatcher.dispatch(b"two", sender);

        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(rx_ok.recv().await.unwrap(), b"one".to_vec());
        assert_eq!(rx_ok.recv().await.unwrap(), b"two".to_vec());

        // The slow peer stays registered; full is not disconnected.
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn closed_peer_is_evicted_and_others_still_receive() {
        let registry = Arc::new(ClientRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));

        let (sender, _rx_sender) = registered(&registry, 7020, 8);
        let (_gone, rx_gone) = registered(&registry, 7021, 8);
        let (_ok, mut rx_ok) = registered(&registry, 7022, 8);

        drop(rx_gone);

        let outcome = dispatcher.dispatch(b"payload", sender);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(rx_ok.recv().await.unwrap(), b"payload".to_vec());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn broadcast_with_no_peers_is_quiet() {
        let registry = Arc::new(ClientRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));

        let (only, _rx) = registered(&registry, 7030, 8);
        let outcome = dispatcher.dispatch(b"echo?", only);
        assert_eq!(outcome, DispatchOutcome::default());
    }

    #[tokio::test]
    async fn per_sender_order_is_preserved() {
        let registry = Arc::new(ClientRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));

        let (sender, _rx_sender) = registered(&registry, 7040, 64);
        let (_peer, mut rx_peer) = registered(&registry, 7041, 64);

        for i in 0..10u8 {
            dispatcher.dispatch(&[i], sender);
        }
        for i in 0..10u8 {
            assert_eq!(rx_peer.recv().await.unwrap(), vec![i]);
        }
    }
}
