//! GoodDollar payment-link withdraw library.
//!
//! Claims escrowed one-time payments: reads the payment behind a code,
//! submits the on-chain withdrawal and keeps the local transaction history
//! in step with the transaction's lifecycle.

pub mod blockchain;
pub mod config;
pub mod ledger;
pub mod observability;
pub mod resilience;
pub mod withdraw;

pub use config::WithdrawConfig;
pub use ledger::{FileLedger, TransactionLedger};
pub use withdraw::{Receipt, WalletClient, WithdrawError, WithdrawOrchestrator};
