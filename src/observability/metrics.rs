//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_connections_total` (counter): connections accepted since start
//! - `relay_connections_active` (gauge): currently registered clients
//! - `relay_messages_relayed_total` (counter): broadcasts dispatched
//! - `relay_bytes_relayed_total` (counter): payload bytes fanned out
//! - `relay_send_failures_total` (counter): per-peer delivery failures, by reason
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so the helpers
//!   are safe to call unconditionally
//! - Low-overhead updates; labels only where the cardinality is tiny

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter on its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connection_opened() {
    counter!("relay_connections_total").increment(1);
    gauge!("relay_connections_active").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("relay_connections_active").decrement(1.0);
}

pub fn record_broadcast(payload_bytes: usize, delivered: usize) {
    counter!("relay_messages_relayed_total").increment(1);
    counter!("relay_bytes_relayed_total").increment((payload_bytes * delivered) as u64);
}

pub fn record_send_failure(reason: &'static str) {
    counter!("relay_send_failures_total", "reason" => reason).increment(1);
}
