//! Retry logic.
//!
//! # Responsibilities
//! - Re-run idempotent async operations with exponential backoff + jitter
//! - Log every failed attempt with its delay
//!
//! # Design Decisions
//! - Callers decide what is idempotent; submission paths never use this
//! - The last error is returned unchanged once attempts are exhausted

use std::future::Future;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Attempt budget and delays for [`retry_with_backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is reached.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: RetryPolicy, op_name: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                tracing::warn!(
                    op = op_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
