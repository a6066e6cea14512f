//! Withdraw data model.

use alloy::primitives::{keccak256, Address, TxHash, B256, U256};
use serde::{Deserialize, Serialize};

/// On-chain state of a payment link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawStatus {
    /// The escrow still holds the payment.
    Pending,
    /// The payment was claimed or cancelled.
    Completed,
    /// No payment was ever recorded for this code.
    Unknown,
}

impl WithdrawStatus {
    /// Derive the status from the escrow's payment record.
    pub fn from_payment(has_payment: bool, sender: Address) -> Self {
        if has_payment {
            WithdrawStatus::Pending
        } else if sender == Address::ZERO {
            WithdrawStatus::Unknown
        } else {
            WithdrawStatus::Completed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawStatus::Pending => "pending",
            WithdrawStatus::Completed => "completed",
            WithdrawStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for WithdrawStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a payment link read at the start of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawDetails {
    pub amount: U256,
    pub sender: Address,
    pub status: WithdrawStatus,
    pub hashed_code: B256,
}

/// Result handed back to the caller of a withdraw attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub status: WithdrawStatus,
    /// Present only when a withdrawal was submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
}

impl Receipt {
    /// No action was taken for a link in `status`.
    pub fn unchanged(status: WithdrawStatus) -> Self {
        Self {
            status,
            transaction_hash: None,
        }
    }

    /// A withdrawal was accepted by the network under `tx_hash`.
    pub fn submitted(status: WithdrawStatus, tx_hash: TxHash) -> Self {
        Self {
            status,
            transaction_hash: Some(tx_hash),
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.transaction_hash.is_some()
    }
}

/// The escrow's lookup key for a payment code.
pub fn hash_code(code: &str) -> B256 {
    keccak256(code.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_status_from_payment() {
        let sender = address!("00000000000000000000000000000000000000aa");
        assert_eq!(WithdrawStatus::from_payment(true, sender), WithdrawStatus::Pending);
        assert_eq!(WithdrawStatus::from_payment(false, sender), WithdrawStatus::Completed);
        assert_eq!(WithdrawStatus::from_payment(false, Address::ZERO), WithdrawStatus::Unknown);
    }

    #[test]
    fn test_receipt_serialization_omits_missing_hash() {
        let json = serde_json::to_value(Receipt::unchanged(WithdrawStatus::Completed)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "completed" }));

        let receipt = Receipt::submitted(WithdrawStatus::Pending, TxHash::repeat_byte(0x11));
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(
            json["transactionHash"],
            format!("0x{}", "11".repeat(32))
        );
    }

    #[test]
    fn test_hash_code_is_keccak_of_utf8() {
        // keccak256("") is a well-known constant
        assert_eq!(
            hash_code("").to_string(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_ne!(hash_code("abc123"), hash_code("abc124"));
    }
}
