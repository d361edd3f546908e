//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain registry → Close listener
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown (idempotent)
//! ```
//!
//! # Design Decisions
//! - Shutdown is a watch channel, not a shared flag: each subscriber's
//!   dependency on it is explicit
//! - Ordered shutdown: stop accept, drain connections, release listener
//! - Shutdown has a grace period: the server stops waiting after a deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
