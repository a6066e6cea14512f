//! Wallet capability consumed by the orchestrator.
//!
//! Submission is two-stage: [`WalletClient::withdraw`] resolves once the
//! network assigned a hash, and the returned [`PendingWithdraw`] carries the
//! confirmation future that settles when the transaction is mined or fails.

use alloy::primitives::{Address, TxHash};
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use thiserror::Error;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::withdraw::types::WithdrawDetails;

/// Second stage of a submission: `Ok` once mined, `Err` on late failure.
pub type Confirmation = BoxFuture<'static, BlockchainResult<()>>;

/// A withdrawal accepted by the network.
pub struct PendingWithdraw {
    pub tx_hash: TxHash,
    pub confirmation: Confirmation,
}

impl PendingWithdraw {
    pub fn new<F>(tx_hash: TxHash, confirmation: F) -> Self
    where
        F: Future<Output = BlockchainResult<()>> + Send + 'static,
    {
        Self {
            tx_hash,
            confirmation: confirmation.boxed(),
        }
    }
}

impl std::fmt::Debug for PendingWithdraw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWithdraw")
            .field("tx_hash", &self.tx_hash)
            .finish_non_exhaustive()
    }
}

/// First-stage submission failure.
///
/// `tx_hash` is set when the transaction was already signed (so its hash is
/// known) but the network did not accept it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct SubmissionFailure {
    pub tx_hash: Option<TxHash>,
    #[source]
    pub error: BlockchainError,
}

impl SubmissionFailure {
    pub fn before_hash(error: BlockchainError) -> Self {
        Self { tx_hash: None, error }
    }

    pub fn after_hash(tx_hash: TxHash, error: BlockchainError) -> Self {
        Self {
            tx_hash: Some(tx_hash),
            error,
        }
    }
}

/// On-chain escrow operations for the active account.
pub trait WalletClient: Send + Sync {
    /// The account withdrawals are paid to.
    fn account(&self) -> Address;

    /// Read the payment record behind `code`. Idempotent.
    fn get_withdraw_details(
        &self,
        code: &str,
    ) -> impl Future<Output = BlockchainResult<WithdrawDetails>> + Send;

    /// Submit the withdrawal; resolves when the network assigned a hash.
    fn withdraw(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<PendingWithdraw, SubmissionFailure>> + Send;
}
