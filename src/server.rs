//! Relay server orchestration.
//!
//! # Responsibilities
//! - Bind the listener (fatal on failure, before any connection is accepted)
//! - Drive the accept loop, spawning one handler per connection
//! - Execute the shutdown sequence: stop accepting, drain the registry,
//!   release the listener, wait out the grace period
//!
//! # Lifecycle
//! ```text
//! Starting → Listening → ShuttingDown → Stopped
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;

use crate::broadcast::Dispatcher;
use crate::config::{ConfigError, RelayConfig};
use crate::lifecycle::Shutdown;
use crate::net::handler::{self, HandlerConfig};
use crate::net::listener::{Listener, ListenerError};
use crate::registry::ClientRegistry;

/// Top-level error for the relay binary.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),
}

/// Server lifecycle state, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Starting,
    Listening,
    ShuttingDown,
    Stopped,
}

/// The broadcast relay server.
#[derive(Debug)]
pub struct RelayServer {
    config: RelayConfig,
    listener: Listener,
    registry: Arc<ClientRegistry>,
}

impl RelayServer {
    /// Bind the listening socket. Bind failure is fatal: the caller should
    /// abort before any connection is accepted.
    pub async fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        tracing::info!(state = ?ServerState::Starting, "Relay starting");
        let listener = Listener::bind(&config.listener).await?;
        Ok(Self { config, listener, registry: Arc::new(ClientRegistry::new()) })
    }

    /// The address the relay is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Shared handle to the client registry.
    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept and relay until shutdown is triggered, then wind down.
    pub async fn run(self, shutdown: Arc<Shutdown>) -> Result<(), RelayError> {
        let Self { config, listener, registry } = self;

        let mut state = ServerState::Listening;
        tracing::info!(
            state = ?state,
            address = ?listener.local_addr().ok(),
            max_connections = listener.max_connections(),
            "Accepting connections"
        );

        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let handler_config = HandlerConfig {
            read_chunk_bytes: config.listener.read_chunk_bytes,
            queue_depth: config.delivery.queue_depth,
        };

        let mut shutdown_rx = shutdown.subscribe();
        let mut handlers = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown_rx.wait_for(|stop| *stop) => break,
                // Reap finished handlers as we go; the registry must stay
                // the only state that grows with connection churn.
                Some(_) = handlers.join_next(), if !handlers.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        handlers.spawn(handler::run(
                            stream,
                            peer_addr,
                            Arc::clone(&registry),
                            dispatcher.clone(),
                            shutdown.subscribe(),
                            handler_config,
                            permit,
                        ));
                    }
                    Err(e) => {
                        // Not caused by shutdown: log and keep accepting.
                        tracing::warn!(error = %e, "Accept failed, continuing");
                    }
                }
            }
        }

        state = ServerState::ShuttingDown;
        tracing::info!(state = ?state, active = registry.len(), "Draining connections");

        registry.close_all();
        drop(listener);

        let grace = Duration::from_secs(config.shutdown.grace_period_secs);
        let drained = tokio::time::timeout(grace, async {
            while handlers.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                grace_secs = config.shutdown.grace_period_secs,
                remaining = handlers.len(),
                "Grace period expired, aborting remaining handlers"
            );
            handlers.abort_all();
            while handlers.join_next().await.is_some() {}
        }

        state = ServerState::Stopped;
        tracing::info!(state = ?state, "Relay stopped");
        Ok(())
    }
}
