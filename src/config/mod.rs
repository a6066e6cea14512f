//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → WithdrawConfig (validated, immutable)
//!     → handed to the blockchain client, ledger and observability setup
//!
//! Signing key:
//!     GD_WALLET_PRIVATE_KEY (environment only, never in the file)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::BlockchainConfig;
pub use schema::EscrowConfig;
pub use schema::LedgerConfig;
pub use schema::ObservabilityConfig;
pub use schema::RetryConfig;
pub use schema::WithdrawConfig;
