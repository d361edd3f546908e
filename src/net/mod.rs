//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, admission limit)
//!     → connection.rs (identity, lifecycle state, delivery handle)
//!     → handler.rs (register, receive loop, broadcast, teardown)
//!
//! Connection States:
//!     Active → Closing → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded admission prevents resource exhaustion
//! - Each connection runs as its own task pair (reader + writer)
//! - Sockets are owned by their connection tasks, never by shared state

pub mod connection;
pub mod handler;
pub mod listener;
