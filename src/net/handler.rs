//! Per-connection handler: registration, receive loop, teardown.
//!
//! # Responsibilities
//! - Register the connection in the client registry
//! - Read payload chunks and hand them to the broadcast dispatcher
//! - Drain the outbound queue into the socket (writer task)
//! - Deregister and release the socket exactly once, on every exit path
//!
//! Errors here are scoped to this connection. Nothing that happens in a
//! handler may terminate another handler or the accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};

use crate::broadcast::Dispatcher;
use crate::net::connection::{ClientHandle, ConnectionId, ConnectionState};
use crate::net::listener::ConnectionPermit;
use crate::observability::metrics;
use crate::registry::ClientRegistry;

/// Handler settings carried over from the relay configuration.
#[derive(Debug, Clone, Copy)]
pub struct HandlerConfig {
    /// Maximum bytes per receive call. No framing: larger logical messages
    /// are split across deliveries.
    pub read_chunk_bytes: usize,
    /// Outbound queue depth for this client.
    pub queue_depth: usize,
}

/// Deregisters the connection when dropped.
///
/// Teardown must happen on every exit path of the receive loop, including
/// error paths, and at most once; double removal is a registry no-op, so a
/// connection already drained by `close_all` is handled too.
struct Registration {
    registry: Arc<ClientRegistry>,
    id: ConnectionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(self.id);
        metrics::record_connection_closed();
    }
}

/// Aborts the writer task when dropped.
///
/// On the normal path the handler awaits the writer so queued payloads
/// flush before the socket closes. If the handler itself is aborted at
/// grace-period expiry, the guard takes a writer still blocked on a
/// stalled peer down with it instead of leaving it running.
struct WriterTask(tokio::task::JoinHandle<()>);

impl Drop for WriterTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one connection to completion.
///
/// Owns the accepted stream and its admission permit. Returns once the
/// peer closes, a receive error occurs, or global shutdown is signalled.
pub async fn run(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    dispatcher: Dispatcher,
    mut shutdown: watch::Receiver<bool>,
    config: HandlerConfig,
    permit: ConnectionPermit,
) {
    let id = ConnectionId::new();
    let _permit = permit;

    let (mut read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Vec<u8>>(config.queue_depth);

    registry.add(ClientHandle::new(id, peer_addr, outbound_tx));
    metrics::record_connection_opened();
    let registration = Registration { registry, id };

    tracing::info!(
        connection_id = %id,
        peer_addr = %peer_addr,
        state = ?ConnectionState::Active,
        "Connection registered"
    );

    let mut writer = WriterTask(tokio::spawn(write_loop(outbound_rx, write_half, id)));

    let mut buf = vec![0u8; config.read_chunk_bytes];
    loop {
        tokio::select! {
            // Resolves immediately if shutdown was already signalled, and
            // treats a dropped shutdown sender the same as a trigger.
            _ = shutdown.wait_for(|stop| *stop) => {
                tracing::debug!(connection_id = %id, "Shutdown signalled, closing connection");
                break;
            }
            result = read_half.read(&mut buf) => match result {
                Ok(0) => {
                    tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Peer closed connection");
                    break;
                }
                Ok(n) => {
                    dispatcher.dispatch(&buf[..n], id);
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %id,
                        peer_addr = %peer_addr,
                        error = %e,
                        "Receive error, closing connection"
                    );
                    break;
                }
            }
        }
    }

    tracing::debug!(connection_id = %id, state = ?ConnectionState::Closing, "Connection closing");

    // Deregistering drops the registry's queue sender; once in-flight
    // broadcast snapshots release their clones the writer sees end of
    // stream, flushes what was already queued, and shuts the socket down.
    drop(registration);
    drop(read_half);

    // Wait for the flush. A writer wedged against a peer that stopped
    // reading holds this await until the grace period aborts the handler,
    // at which point the guard aborts the writer too.
    let _ = (&mut writer.0).await;

    tracing::info!(
        connection_id = %id,
        peer_addr = %peer_addr,
        state = ?ConnectionState::Closed,
        "Connection closed"
    );
}

/// Drain the outbound queue into the socket.
///
/// Ends when the queue closes (deregistration or `close_all`) or the peer
/// stops accepting writes. A write failure only affects this client.
async fn write_loop(mut outbound: mpsc::Receiver<Vec<u8>>, mut write_half: OwnedWriteHalf, id: ConnectionId) {
    while let Some(payload) = outbound.recv().await {
        if let Err(e) = write_half.write_all(&payload).await {
            tracing::debug!(connection_id = %id, error = %e, "Send failed, stopping writer");
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
