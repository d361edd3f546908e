//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! relay.toml
//!     → loader.rs (read, parse)
//!     → validation.rs (semantic checks, all errors reported)
//!     → schema.rs types consumed by the rest of the system
//! ```
//!
//! # Design Decisions
//! - Every section has serde defaults; an empty file is a valid config
//! - Validation is a pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - An invalid config is fatal at startup, never patched up silently

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    DeliveryConfig, ListenerConfig, ObservabilityConfig, RelayConfig, ShutdownConfig,
};
pub use validation::{validate_config, ValidationError};
