//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Query chain state (block number, nonce, gas price, receipts, contract calls)
//! - Broadcast signed transactions
//! - Handle timeouts and network errors gracefully

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult};
use crate::observability::metrics;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Configuration.
    config: BlockchainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Fails only if the primary RPC URL is malformed; an unreachable node is
    /// logged and tolerated.
    pub async fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(
            Arc::new(ProviderBuilder::new().connect_http(primary_url)) as Arc<dyn Provider + Send + Sync>
        );

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(
                    Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>
                );
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    "Blockchain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<u64> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_chain_id()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "RPC timeout, trying next provider");
                }
            }
        }
        Err(BlockchainError::Rpc("All RPC providers failed".to_string()))
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_block_number()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(BlockchainError::Rpc("All providers failed to get block number".to_string()))
    }

    /// Get the transaction count (nonce) for an address.
    pub async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_transaction_count(address)).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(BlockchainError::Rpc("All providers failed to get transaction count".to_string()))
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_transaction_receipt(tx_hash)).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(BlockchainError::Rpc("All providers failed to get receipt".to_string()))
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_gas_price()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(BlockchainError::Rpc("All providers failed to get gas price".to_string()))
    }

    /// Execute a read-only contract call (`eth_call`) and return the raw output.
    pub async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.call(tx.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(BlockchainError::Rpc("All providers failed to execute call".to_string()))
    }

    /// Broadcast a signed, EIP-2718 encoded transaction.
    ///
    /// Failover is attempted: a node that already knows the transaction will
    /// reject the duplicate, which is reported as an error by the last node.
    pub async fn send_raw_transaction(&self, encoded: &[u8]) -> BlockchainResult<TxHash> {
        let mut last_error = String::from("no providers configured");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.send_raw_transaction(encoded)).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "Broadcast failed");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "Broadcast timeout");
                    last_error = format!("timeout after {} seconds", self.config.rpc_timeout_secs);
                }
            }
        }
        Err(BlockchainError::Rpc(format!("Broadcast failed: {}", last_error)))
    }

    /// Check if the blockchain is reachable and healthy.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_rpc_health(&self.config.rpc_url, healthy);
        healthy
    }

    /// Get the configuration.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// Get the number of confirmation blocks required.
    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> BlockchainConfig {
        BlockchainConfig {
            // Reserved port on loopback; nothing listens there.
            rpc_url: "http://127.0.0.1:1".to_string(),
            rpc_timeout_secs: 1,
            ..BlockchainConfig::default()
        }
    }

    #[tokio::test]
    async fn test_client_creation_tolerates_unreachable_node() {
        let result = BlockchainClient::new(unreachable_config()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_rpc_url_rejected() {
        let config = BlockchainConfig {
            rpc_url: "not a url".to_string(),
            ..BlockchainConfig::default()
        };
        let err = BlockchainClient::new(config).await.unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausts_all_providers() {
        let mut config = unreachable_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        config.failover_urls.push("::not-a-url::".to_string());

        let client = BlockchainClient::new(config).await.unwrap();
        let result = client.get_chain_id().await;
        assert!(result.unwrap_err().to_string().contains("All RPC providers failed"));
        assert!(!client.is_healthy().await);
    }
}
