//! Local transaction history.
//!
//! # Data Flow
//! ```text
//! orchestrator settlement task
//!     → enqueue(TransactionEvent)          (pending record keyed by hash)
//!     → mark_with_error_event(Some(hash))  (late failure)
//!     → store.rs (DashMap + JSON file)
//!
//! CLI history
//!     → list() / summary()
//! ```
//!
//! # Design Decisions
//! - Keyed by transaction hash; re-enqueueing a hash replaces the record
//! - An error mark that arrives before its record is remembered and applied on enqueue
//! - Every mutation is persisted before the call returns

pub mod store;
pub mod types;

use alloy::primitives::TxHash;
use std::future::Future;
use thiserror::Error;

pub use store::FileLedger;
pub use types::{EventStatus, OtplStatus, TransactionEvent, TransactionType, WithdrawEventData};

/// Errors raised by ledger persistence.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Append-only store of the wallet's transaction records.
pub trait TransactionLedger: Send + Sync {
    /// Record a transaction that was just accepted by the network.
    fn enqueue(&self, event: TransactionEvent) -> impl Future<Output = LedgerResult<()>> + Send;

    /// Mark the record for `tx_hash` as failed. `None` means the failure
    /// happened before any hash was assigned.
    fn mark_with_error_event(
        &self,
        tx_hash: Option<TxHash>,
    ) -> impl Future<Output = LedgerResult<()>> + Send;
}
