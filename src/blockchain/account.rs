//! The withdrawing account: signing key and nonce sequence.
//!
//! The key is read from `GD_WALLET_PRIVATE_KEY` and never reaches a log line
//! or a `Debug` impl.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable holding the hex private key of the claiming account.
pub const PRIVATE_KEY_ENV_VAR: &str = "GD_WALLET_PRIVATE_KEY";

/// Key of the account that receives withdrawn payments.
///
/// Clones share one nonce counter, so every escrow handle built from the same
/// key hands out distinct nonces.
#[derive(Clone)]
pub struct AccountKey {
    signer: PrivateKeySigner,
    next_nonce: Arc<AtomicU64>,
    chain_id: u64,
}

impl AccountKey {
    /// Load the account key for `chain_id` from the environment.
    pub fn from_env(chain_id: u64) -> BlockchainResult<Self> {
        let raw = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!("{} is not set", PRIVATE_KEY_ENV_VAR))
        })?;
        let key = Self::parse(&raw, chain_id)?;
        tracing::info!(account = %key.address(), chain_id, "Withdraw account loaded");
        Ok(key)
    }

    fn parse(raw: &str, chain_id: u64) -> BlockchainResult<Self> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        // The parse error is dropped on purpose: some of them quote the input.
        let signer: PrivateKeySigner = hex.parse().map_err(|_| {
            BlockchainError::Wallet(format!("{} is not a valid private key", PRIVATE_KEY_ENV_VAR))
        })?;

        Ok(Self {
            signer,
            next_nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Reserve a nonce for the next transaction.
    ///
    /// `chain_count` is the account's transaction count as reported by the
    /// node. The local sequence jumps forward to it but never moves back, so
    /// transactions this process has broadcast and the node has not counted
    /// yet keep their nonces.
    pub fn reserve_nonce(&self, chain_count: u64) -> u64 {
        self.next_nonce.fetch_max(chain_count, Ordering::SeqCst);
        self.next_nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// Network wallet used to sign transaction envelopes.
    pub fn network_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
