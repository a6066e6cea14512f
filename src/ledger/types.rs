//! Ledger record types.

use alloy::primitives::{Address, TxHash, B256, U256};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Withdraw,
}

/// Ledger-side state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Pending,
    Error,
}

/// State of the one-time payment link from the claimer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtplStatus {
    Completed,
}

/// Payload of a withdraw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawEventData {
    pub from: Address,
    pub amount: U256,
    pub code: String,
    pub hashed_code: B256,
    pub reason: String,
    pub category: String,
    pub otpl_status: OtplStatus,
}

/// One record in the transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Transaction hash.
    pub id: TxHash,
    /// Creation time (seconds since epoch).
    pub date: u64,
    #[serde(rename = "type")]
    pub event_type: TransactionType,
    #[serde(default)]
    pub status: EventStatus,
    pub data: WithdrawEventData,
}

impl TransactionEvent {
    /// A pending withdraw record stamped with the current time.
    pub fn withdraw(id: TxHash, data: WithdrawEventData) -> Self {
        let date = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            id,
            date,
            event_type: TransactionType::Withdraw,
            status: EventStatus::Pending,
            data,
        }
    }

    pub fn is_errored(&self) -> bool {
        self.status == EventStatus::Error
    }
}
