//! Payment-link withdraw subsystem.
//!
//! # Data Flow
//! ```text
//! caller (code, reason, category)
//!     → orchestrator.rs
//!         → WalletClient::get_withdraw_details   (read, idempotent)
//!         → self-withdraw guard / status branch
//!         → WalletClient::withdraw                (stage 1: hash assigned)
//!     ← Receipt { status, transaction_hash }
//!
//! detached settlement task (per submission):
//!     → TransactionLedger::enqueue(pending event)
//!     → await confirmation                        (stage 2)
//!     → TransactionLedger::mark_with_error_event on late failure
//! ```
//!
//! # Design Decisions
//! - The caller waits for the hash only, never for mining
//! - Status check is read-then-act; same-code calls are not serialized here
//! - Errors are logged with full context and returned unchanged

pub mod client;
pub mod error;
pub mod orchestrator;
pub mod types;

pub use client::{Confirmation, PendingWithdraw, SubmissionFailure, WalletClient};
pub use error::{ErrorCategory, WithdrawError};
pub use orchestrator::WithdrawOrchestrator;
pub use types::{hash_code, Receipt, WithdrawDetails, WithdrawStatus};
