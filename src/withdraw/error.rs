//! Withdraw error taxonomy.

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::blockchain::types::BlockchainError;

/// Who is at fault for a failed attempt. Attached to logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Human,
    Blockchain,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Human => "human",
            ErrorCategory::Blockchain => "blockchain",
        }
    }
}

/// Errors returned by [`crate::withdraw::WithdrawOrchestrator::execute_withdraw`].
#[derive(Debug, Error)]
pub enum WithdrawError {
    /// The payment link was created by the active account.
    #[error("You can't withdraw your own payment link.")]
    SelfWithdraw,

    /// The code is empty.
    #[error("Withdraw code must not be empty")]
    InvalidCode,

    /// Reading the payment record failed; nothing was changed.
    #[error("Failed to read withdraw details: {0}")]
    DetailsFetch(#[source] BlockchainError),

    /// The network did not accept the withdrawal.
    #[error("Withdraw submission failed: {source}")]
    Submission {
        tx_hash: Option<TxHash>,
        #[source]
        source: BlockchainError,
    },
}

impl WithdrawError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WithdrawError::SelfWithdraw | WithdrawError::InvalidCode => ErrorCategory::Human,
            WithdrawError::DetailsFetch(_) | WithdrawError::Submission { .. } => {
                ErrorCategory::Blockchain
            }
        }
    }

    /// Metric label for the failed attempt.
    pub fn outcome(&self) -> &'static str {
        match self {
            WithdrawError::SelfWithdraw => "self_withdraw",
            WithdrawError::InvalidCode => "invalid_code",
            WithdrawError::DetailsFetch(_) => "details_failed",
            WithdrawError::Submission { .. } => "submission_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_categories() {
        assert_eq!(WithdrawError::SelfWithdraw.category(), ErrorCategory::Human);
        assert_eq!(WithdrawError::InvalidCode.category(), ErrorCategory::Human);
        assert_eq!(
            WithdrawError::DetailsFetch(BlockchainError::Timeout(5)).category(),
            ErrorCategory::Blockchain
        );
        assert_eq!(ErrorCategory::Blockchain.as_str(), "blockchain");
    }

    #[test]
    fn test_self_withdraw_message() {
        assert!(WithdrawError::SelfWithdraw
            .to_string()
            .ends_with("your own payment link."));
    }

    #[test]
    fn test_submission_keeps_source() {
        let err = WithdrawError::Submission {
            tx_hash: None,
            source: BlockchainError::Rpc("nonce too low".into()),
        };
        assert_eq!(err.outcome(), "submission_failed");
        assert_eq!(err.source().unwrap().to_string(), "RPC error: nonce too low");
    }
}
