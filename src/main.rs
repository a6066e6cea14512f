//! GoodDollar payment-link withdraw CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   gd-withdraw withdraw --code C
//!        │
//!        ▼
//!   ┌──────────────────────┐   details / withdraw   ┌──────────────┐
//!   │ WithdrawOrchestrator │───────────────────────▶│ EscrowWallet │──▶ RPC node(s)
//!   └──────────┬───────────┘                        └──────────────┘
//!              │ enqueue / mark error (background)
//!              ▼
//!   ┌──────────────────────┐
//!   │ FileLedger (JSON)    │
//!   └──────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use gooddollar_withdraw::blockchain::{AccountKey, BlockchainClient, EscrowWallet};
use gooddollar_withdraw::config::loader::load_config;
use gooddollar_withdraw::observability::{logging, metrics};
use gooddollar_withdraw::resilience::RetryPolicy;
use gooddollar_withdraw::withdraw::WalletClient;
use gooddollar_withdraw::{FileLedger, WithdrawConfig, WithdrawOrchestrator};

#[derive(Parser)]
#[command(name = "gd-withdraw")]
#[command(about = "Claim GoodDollar payment links", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gd-withdraw.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the on-chain state of a payment link
    Details {
        #[arg(long)]
        code: String,
    },
    /// Withdraw a payment link to the configured account
    Withdraw {
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Keep running until the transaction is mined or fails
        #[arg(long)]
        wait: bool,
    },
    /// Show the local transaction history
    History,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(config = %cli.config.display(), "gd-withdraw starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let ledger = Arc::new(FileLedger::load_from_file(&config.ledger.path)?);

    match cli.command {
        Commands::History => print_history(&ledger)?,
        Commands::Details { code } => {
            let wallet = connect_wallet(&config).await?;
            let details = wallet.get_withdraw_details(&code).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Commands::Withdraw {
            code,
            reason,
            category,
            wait,
        } => {
            let wallet = Arc::new(connect_wallet(&config).await?);
            let orchestrator = WithdrawOrchestrator::new(wallet, Arc::clone(&ledger));
            let receipt = orchestrator.execute_withdraw(&code, &reason, &category).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);

            // The ledger record is written by a background task; it must land
            // before the runtime shuts down.
            let recorded = orchestrator.flush().await;
            tracing::debug!(recorded, "Ledger records written");

            if wait {
                tokio::select! {
                    settled = orchestrator.settle() => {
                        tracing::debug!(settled, "Settlement finished");
                        if let Some(record) = receipt.transaction_hash.and_then(|h| ledger.get(&h)) {
                            println!("{}", serde_json::to_string_pretty(&record)?);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::warn!("Interrupted; the transaction keeps going on-chain");
                    }
                }
            }
        }
    }

    Ok(())
}

async fn connect_wallet(config: &WithdrawConfig) -> Result<EscrowWallet, Box<dyn std::error::Error>> {
    let key = AccountKey::from_env(config.blockchain.chain_id)?;
    let client = BlockchainClient::new(config.blockchain.clone()).await?;
    if !client.is_healthy().await {
        tracing::warn!(rpc_url = %config.blockchain.rpc_url, "RPC node is not answering; requests will fail over or time out");
    }
    let escrow = config.escrow.contract_address.parse()?;
    Ok(EscrowWallet::new(
        client,
        key,
        escrow,
        RetryPolicy::from(&config.retries),
    ))
}

fn print_history(ledger: &FileLedger) -> Result<(), Box<dyn std::error::Error>> {
    let (pending, errored) = ledger.summary();
    let output = serde_json::json!({
        "pending": pending,
        "errored": errored,
        "events": ledger.list(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
