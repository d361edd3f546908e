//! Concurrent TCP Broadcast Relay
//!
//! Accepts TCP client connections and broadcasts any byte payload received
//! from one client to every other currently-connected client. Best-effort,
//! in-process fan-out over an unframed byte stream.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                BROADCAST RELAY                │
//!                     │                                              │
//!   Client connect    │  ┌──────────┐      ┌─────────────────────┐  │
//!   ──────────────────┼─▶│   net    │─────▶│    net::handler     │  │
//!                     │  │ listener │ spawn │ (register, receive) │  │
//!                     │  └──────────┘      └──────────┬──────────┘  │
//!                     │                               │ payload      │
//!                     │                               ▼              │
//!                     │  ┌──────────┐      ┌─────────────────────┐  │
//!   Other clients     │  │ registry │◀────▶│      broadcast      │  │
//!   ◀─────────────────┼──│ (shared) │ snap  │     dispatcher      │  │
//!                     │  └──────────┘      └─────────────────────┘  │
//!                     │                                              │
//!                     │  ┌────────────────────────────────────────┐ │
//!                     │  │          Cross-Cutting Concerns         │ │
//!                     │  │  config   lifecycle    observability    │ │
//!                     │  └────────────────────────────────────────┘ │
//!                     └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod broadcast;
pub mod config;
pub mod net;
pub mod registry;
pub mod server;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::RelayConfig;
pub use lifecycle::Shutdown;
pub use server::{RelayError, RelayServer};
