//! Transaction building, signing, and confirmation monitoring.
//!
//! # Responsibilities
//! - Build transactions with nonce sync and gas price protection
//! - Sign locally so the hash is known before broadcast
//! - Broadcast and monitor confirmations

use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, timeout};

use crate::blockchain::account::AccountKey;
use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// Hash of the signed envelope.
    pub tx_hash: TxHash,
    /// EIP-2718 encoded envelope.
    pub encoded: Vec<u8>,
}

/// Where and how a transaction was mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inclusion {
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Chain reads needed to follow a broadcast transaction.
pub trait ReceiptSource: Send + Sync {
    /// `None` while the transaction is not mined.
    fn inclusion(&self, tx_hash: TxHash) -> impl Future<Output = BlockchainResult<Option<Inclusion>>> + Send;

    fn head_block(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;
}

impl ReceiptSource for BlockchainClient {
    async fn inclusion(&self, tx_hash: TxHash) -> BlockchainResult<Option<Inclusion>> {
        Ok(self.get_transaction_receipt(tx_hash).await?.map(|receipt| Inclusion {
            block_number: receipt.block_number,
            success: receipt.status(),
        }))
    }

    async fn head_block(&self) -> BlockchainResult<u64> {
        self.get_block_number().await
    }
}

/// Transaction builder for contract calls.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    client: BlockchainClient,
    account: AccountKey,
}

impl TxBuilder {
    /// Create a new transaction builder.
    pub fn new(client: BlockchainClient, account: AccountKey) -> Self {
        Self { client, account }
    }

    /// Build a transaction request with nonce and gas price set.
    ///
    /// # Arguments
    /// * `to` - Destination address
    /// * `value` - Amount of native token to send
    /// * `data` - Call data
    /// * `gas_limit` - Gas limit for the call
    pub async fn build(
        &self,
        to: Address,
        value: U256,
        data: Bytes,
        gas_limit: u64,
    ) -> BlockchainResult<TransactionRequest> {
        let chain_count = self.client.get_transaction_count(self.account.address()).await?;

        let gas_price = self.client.get_gas_price().await?;
        let config = self.client.config();
        let adjusted_gas_price = adjust_gas_price(
            gas_price,
            config.gas_price_multiplier,
            config.max_gas_price_gwei,
        )?;

        let nonce = self.account.reserve_nonce(chain_count);

        Ok(TransactionRequest::default()
            .with_from(self.account.address())
            .with_to(to)
            .with_value(value)
            .with_input(data)
            .with_nonce(nonce)
            .with_gas_price(adjusted_gas_price)
            .with_chain_id(self.account.chain_id())
            .with_gas_limit(gas_limit))
    }

    /// Build and sign a transaction without broadcasting it.
    pub async fn build_signed(
        &self,
        to: Address,
        value: U256,
        data: Bytes,
        gas_limit: u64,
    ) -> BlockchainResult<SignedTransaction> {
        let request = self.build(to, value, data, gas_limit).await?;
        let envelope = request
            .build(&self.account.network_wallet())
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        Ok(SignedTransaction {
            tx_hash: *envelope.tx_hash(),
            encoded: envelope.encoded_2718(),
        })
    }

    /// Broadcast a signed transaction.
    pub async fn broadcast(&self, signed: &SignedTransaction) -> BlockchainResult<TxHash> {
        let accepted = self.client.send_raw_transaction(&signed.encoded).await?;
        if accepted != signed.tx_hash {
            tracing::warn!(
                expected = %signed.tx_hash,
                reported = %accepted,
                "Node reported a different transaction hash"
            );
        }
        Ok(signed.tx_hash)
    }

    /// Wait for a transaction to reach the configured confirmation depth.
    ///
    /// Returns the inclusion block.
    pub async fn wait_for_confirmation(&self, tx_hash: TxHash, timeout_secs: u64) -> BlockchainResult<u64> {
        watch_confirmation(
            &self.client,
            tx_hash,
            self.client.confirmation_blocks(),
            RECEIPT_POLL_INTERVAL,
            Duration::from_secs(timeout_secs),
        )
        .await
    }
}

/// Poll `source` until `tx_hash` is `required` blocks deep.
///
/// RPC failures while polling are logged and retried; only a reverted receipt
/// or running out of `limit` ends the watch with an error.
pub async fn watch_confirmation<S: ReceiptSource>(
    source: &S,
    tx_hash: TxHash,
    required: u32,
    poll_interval: Duration,
    limit: Duration,
) -> BlockchainResult<u64> {
    let watch = async {
        let mut ticker = interval(poll_interval);

        loop {
            ticker.tick().await;

            let inclusion = match source.inclusion(tx_hash).await {
                Ok(Some(inclusion)) => inclusion,
                Ok(None) => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed, polling again");
                    continue;
                }
            };

            if !inclusion.success {
                return Err(BlockchainError::Reverted(format!(
                    "{} failed in block {}",
                    tx_hash,
                    inclusion.block_number.map_or_else(|| "?".to_string(), |b| b.to_string())
                )));
            }

            let head = match source.head_block().await {
                Ok(head) => head,
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Block number lookup failed, polling again");
                    continue;
                }
            };
            let tx_block = inclusion.block_number.unwrap_or(head);
            let confirmations = confirmations(head, tx_block);

            if confirmations >= required {
                return Ok(tx_block);
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations,
                required,
                "Waiting for confirmations"
            );
        }
    };

    match timeout(limit, watch).await {
        Ok(result) => result,
        Err(_) => Err(BlockchainError::ConfirmationTimeout(limit.as_secs())),
    }
}

/// Blocks on top of and including `tx_block`; a lagging head counts as zero.
fn confirmations(head: u64, tx_block: u64) -> u32 {
    if head < tx_block {
        return 0;
    }
    u32::try_from(head - tx_block + 1).unwrap_or(u32::MAX)
}

/// Apply the safety multiplier to a node gas price, refusing spikes above the cap.
pub fn adjust_gas_price(gas_price_wei: u128, multiplier: f64, max_gwei: u64) -> BlockchainResult<u128> {
    let gas_price_gwei = gas_price_wei / 1_000_000_000;
    if gas_price_gwei > max_gwei as u128 {
        return Err(BlockchainError::GasPriceTooHigh {
            current_gwei: gas_price_gwei as u64,
            max_gwei,
        });
    }
    Ok((gas_price_wei as f64 * multiplier) as u128)
}
