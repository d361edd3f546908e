//! Connection identity, state machine, and the handle shared with the registry.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track connection state (Active → Closing → Closed)
//! - Expose the per-client delivery handle used for broadcast fan-out

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
///
/// `Active → Closing` on read EOF/error or global shutdown,
/// `Closing → Closed` once deregistered and the socket is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connection is registered and relaying payloads.
    Active,
    /// Receive loop has ended; teardown in progress.
    Closing,
    /// Deregistered and socket released.
    Closed,
}

/// The registry's view of one connected client.
///
/// The socket itself stays owned by the connection's reader/writer tasks;
/// the handle only carries the outbound queue feeding the writer. Cloning a
/// handle clones the queue sender, so a broadcast snapshot can deliver
/// without holding any registry lock.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ConnectionId,
    peer_addr: SocketAddr,
    outbound: mpsc::Sender<Vec<u8>>,
}

impl ClientHandle {
    pub fn new(id: ConnectionId, peer_addr: SocketAddr, outbound: mpsc::Sender<Vec<u8>>) -> Self {
        Self { id, peer_addr, outbound }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Queue a payload for this client without blocking.
    ///
    /// `Full` means the client is consuming too slowly and this payload is
    /// dropped for it; `Closed` means the client's writer has already gone
    /// away (the connection is tearing down).
    pub fn try_deliver(&self, payload: Vec<u8>) -> Result<(), TrySendError<Vec<u8>>> {
        self.outbound.try_send(payload)
    }

    /// Whether the client's writer has stopped accepting payloads.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId::new();
        assert!(format!("{}", id).starts_with("conn-"));
    }

    #[tokio::test]
    async fn handle_delivers_to_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ClientHandle::new(ConnectionId::new(), "127.0.0.1:4000".parse().unwrap(), tx);

        handle.try_deliver(b"ping".to_vec()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), b"ping".to_vec());
    }

    #[tokio::test]
    async fn full_queue_reports_full_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ClientHandle::new(ConnectionId::new(), "127.0.0.1:4000".parse().unwrap(), tx);

        handle.try_deliver(vec![1]).unwrap();
        let err = handle.try_deliver(vec![2]).unwrap_err();
        assert!(matches!(err, TrySendError::Full(_)));
    }

    #[tokio::test]
    async fn dropped_receiver_reports_closed() {
        let (tx, rx) = mpsc::channel(1);
        let handle = ClientHandle::new(ConnectionId::new(), "127.0.0.1:4000".parse().unwrap(), tx);

        drop(rx);
        assert!(handle.is_closed());
        let err = handle.try_deliver(vec![1]).unwrap_err();
        assert!(matches!(err, TrySendError::Closed(_)));
    }
}
