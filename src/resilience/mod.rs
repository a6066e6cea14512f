//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Idempotent chain read (withdraw details):
//!     → retries.rs (re-run on failure up to max_attempts)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Only reads are retried; withdraw submission is never retried
//! - Every RPC call already has its own deadline in the blockchain client

pub mod backoff;
pub mod retries;

pub use retries::{retry_with_backoff, RetryPolicy};
