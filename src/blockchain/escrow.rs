//! One-time-payments escrow bindings and the on-chain [`WalletClient`].

use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::network::TransactionBuilder;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::account::AccountKey;
use crate::blockchain::client::BlockchainClient;
use crate::blockchain::transaction::TxBuilder;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::resilience::{retry_with_backoff, RetryPolicy};
use crate::withdraw::client::{PendingWithdraw, SubmissionFailure, WalletClient};
use crate::withdraw::types::{hash_code, WithdrawDetails, WithdrawStatus};

sol! {
    /// Payment record lookup by hashed code.
    function payments(bytes32 paymentId) external view returns (bool hasPayment, uint256 paymentAmount, address paymentSender);

    /// Release the escrowed payment to the caller.
    function withdraw(string code) external;
}

/// [`WalletClient`] backed by the one-time-payments contract.
#[derive(Debug, Clone)]
pub struct EscrowWallet {
    client: BlockchainClient,
    tx_builder: TxBuilder,
    account: Address,
    escrow: Address,
    read_policy: RetryPolicy,
}

impl EscrowWallet {
    /// Create an escrow wallet.
    ///
    /// # Arguments
    /// * `client` - RPC client for reads and broadcast
    /// * `key` - Signing key; its address is the withdraw recipient
    /// * `escrow` - One-time-payments contract address
    /// * `read_policy` - Retry policy for details reads
    pub fn new(client: BlockchainClient, key: AccountKey, escrow: Address, read_policy: RetryPolicy) -> Self {
        let account = key.address();
        Self {
            tx_builder: TxBuilder::new(client.clone(), key),
            client,
            account,
            escrow,
            read_policy,
        }
    }

    async fn read_payment(&self, code: &str) -> BlockchainResult<WithdrawDetails> {
        let hashed_code = hash_code(code);
        let call = paymentsCall { paymentId: hashed_code };
        let request = TransactionRequest::default()
            .with_to(self.escrow)
            .with_input(call.abi_encode());

        let output = self.client.call(request).await?;
        let payment = paymentsCall::abi_decode_returns(&output)
            .map_err(|e| BlockchainError::Decode(format!("payments(): {}", e)))?;

        Ok(WithdrawDetails {
            amount: payment.paymentAmount,
            sender: payment.paymentSender,
            status: WithdrawStatus::from_payment(payment.hasPayment, payment.paymentSender),
            hashed_code,
        })
    }
}

impl WalletClient for EscrowWallet {
    fn account(&self) -> Address {
        self.account
    }

    async fn get_withdraw_details(&self, code: &str) -> BlockchainResult<WithdrawDetails> {
        retry_with_backoff(self.read_policy, "get_withdraw_details", || self.read_payment(code)).await
    }

    async fn withdraw(&self, code: &str) -> Result<PendingWithdraw, SubmissionFailure> {
        let call = withdrawCall { code: code.to_string() };
        let gas_limit = self.client.config().withdraw_gas_limit;

        let signed = self
            .tx_builder
            .build_signed(self.escrow, U256::ZERO, call.abi_encode().into(), gas_limit)
            .await
            .map_err(SubmissionFailure::before_hash)?;

        let tx_hash = self
            .tx_builder
            .broadcast(&signed)
            .await
            .map_err(|e| SubmissionFailure::after_hash(signed.tx_hash, e))?;

        let builder = self.tx_builder.clone();
        let timeout_secs = self.client.config().confirmation_timeout_secs;
        let confirmation = async move {
            let block_number = builder
                .wait_for_confirmation(tx_hash, timeout_secs)
                .await?;
            tracing::debug!(tx_hash = %tx_hash, block_number, "Withdraw mined");
            Ok(())
        };

        Ok(PendingWithdraw::new(tx_hash, confirmation))
    }
}
