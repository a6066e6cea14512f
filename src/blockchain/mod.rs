//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variable (private key) + [blockchain] config
//!     → account.rs (key loading, nonce)
//!     → client.rs (RPC connection with timeouts and failover)
//!     → transaction.rs (build, sign, broadcast, confirm)
//!     → escrow.rs (one-time-payments calls, WalletClient impl)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys
//! - All RPC calls have configurable timeouts

pub mod account;
pub mod client;
pub mod escrow;
pub mod transaction;
pub mod types;

pub use account::AccountKey;
pub use client::BlockchainClient;
pub use escrow::EscrowWallet;
pub use types::{BlockchainConfig, BlockchainError};
