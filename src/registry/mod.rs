//! Shared registry of active client connections.
//!
//! # Responsibilities
//! - Track every registered client behind a single mutex
//! - Hand out consistent snapshots for broadcast fan-out
//! - Drain all clients during shutdown
//!
//! # Invariant
//! A handle is present here if and only if its connection handler has
//! completed registration and has not yet completed deregistration.
//! Membership and socket validity never diverge for longer than one
//! critical section.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::net::connection::{ClientHandle, ConnectionId};

/// Thread-safe collection of active connection handles.
///
/// The lock is held only for bounded critical sections: insertion, removal,
/// snapshotting, and draining. It is never held across an await point;
/// actual socket I/O happens on snapshot copies outside the lock.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ConnectionId, ClientHandle>>,
}

impl ClientRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self { clients: Mutex::new(HashMap::new()) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, ClientHandle>> {
        // Every critical section leaves the map consistent, so a poisoned
        // lock from a panicked holder is safe to recover.
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a client handle.
    pub fn add(&self, handle: ClientHandle) {
        let id = handle.id();
        self.lock().insert(id, handle);
        tracing::debug!(connection_id = %id, "Client registered");
    }

    /// Deregister a client. Removing an absent id is a no-op, not an error.
    ///
    /// Returns `true` if the client was present.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(connection_id = %id, "Client deregistered");
        }
        removed
    }

    /// Take a consistent snapshot of every client except `sender`.
    ///
    /// Concurrent add/remove during a broadcast cannot produce a torn view:
    /// the copy is made in one critical section and sends happen on the
    /// copy, outside the lock.
    pub fn snapshot_except(&self, sender: ConnectionId) -> Vec<ClientHandle> {
        self.lock()
            .values()
            .filter(|handle| handle.id() != sender)
            .cloned()
            .collect()
    }

    /// Close every tracked connection and clear the set.
    ///
    /// Dropping a handle closes that client's outbound queue, which stops
    /// its writer task and releases the socket. Safe to call repeatedly and
    /// while some handles are already closing.
    pub fn close_all(&self) -> usize {
        let mut clients = self.lock();
        let drained = clients.len();
        clients.clear();
        if drained > 0 {
            tracing::info!(connections = drained, "Registry drained");
        }
        drained
    }

    /// Number of currently registered clients.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
