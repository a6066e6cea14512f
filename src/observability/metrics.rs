//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gd_withdraw_attempts_total` (counter): attempts by outcome
//! - `gd_withdraw_late_failures_total` (counter): failures after a hash was assigned
//! - `gd_ledger_events` (gauge): records held by the transaction ledger
//! - `gd_rpc_health` (gauge): 1=reachable, 0=unreachable
//!
//! # Design Decisions
//! - Uses the `metrics` facade; without an installed recorder every call is a no-op
//! - Prometheus exporter is opt-in via config

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const WITHDRAW_ATTEMPTS: &str = "gd_withdraw_attempts_total";
pub const WITHDRAW_LATE_FAILURES: &str = "gd_withdraw_late_failures_total";
pub const LEDGER_EVENTS: &str = "gd_ledger_events";
pub const RPC_HEALTH: &str = "gd_rpc_health";

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one withdraw attempt.
pub fn record_withdraw_attempt(outcome: &'static str) {
    counter!(WITHDRAW_ATTEMPTS, "outcome" => outcome).increment(1);
}

/// Record a withdrawal that failed after the caller already got its receipt.
pub fn record_late_failure() {
    counter!(WITHDRAW_LATE_FAILURES).increment(1);
}

/// Record the current number of ledger records.
pub fn record_ledger_size(size: usize) {
    gauge!(LEDGER_EVENTS).set(size as f64);
}

/// Record RPC reachability.
pub fn record_rpc_health(endpoint: &str, healthy: bool) {
    gauge!(RPC_HEALTH, "endpoint" => endpoint.to_string()).set(if healthy { 1.0 } else { 0.0 });
}
