//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, one span per withdraw attempt)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, plain or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every log event; no string-formatted context
//! - Each withdraw attempt carries an `attempt_id` for correlation
//! - Metrics are cheap (recorder no-ops when no exporter is installed)

pub mod logging;
pub mod metrics;
