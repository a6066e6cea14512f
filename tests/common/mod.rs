//! Shared test doubles for withdraw flow tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use alloy::primitives::{Address, TxHash, U256};
use gooddollar_withdraw::blockchain::types::{BlockchainError, BlockchainResult};
use gooddollar_withdraw::ledger::{LedgerResult, TransactionEvent, TransactionLedger};
use gooddollar_withdraw::withdraw::{
    hash_code, PendingWithdraw, SubmissionFailure, WalletClient, WithdrawDetails, WithdrawStatus,
};
use tokio::sync::oneshot;

/// How one `withdraw` call behaves.
#[allow(dead_code)]
pub enum Script {
    /// Hash assigned, then mined successfully.
    Confirm(TxHash),
    /// Hash assigned, then fails once mined (e.g. reverted).
    LateFailure(TxHash, String),
    /// Hash assigned; the confirmation outcome is sent through the channel.
    Gated(TxHash, oneshot::Receiver<BlockchainResult<()>>),
    /// Signed locally but the network rejected the broadcast.
    RejectAfterHash(TxHash, String),
    /// Failed before any hash existed.
    RejectBeforeHash(String),
}

/// Scripted wallet; scripts are consumed in order, one per `withdraw` call.
///
/// The code stays `Pending` while scripts remain and turns `Completed` once the
/// last scripted withdrawal is accepted.
pub struct MockWallet {
    pub account: Address,
    pub sender: Address,
    pub amount: U256,
    status: Mutex<WithdrawStatus>,
    details_error: Mutex<Option<String>>,
    scripts: Mutex<VecDeque<Script>>,
    pub details_calls: AtomicU32,
    pub withdraw_calls: AtomicU32,
}

#[allow(dead_code)]
impl MockWallet {
    pub fn new(account: Address, sender: Address, amount: u64, status: WithdrawStatus) -> Self {
        Self {
            account,
            sender,
            amount: U256::from(amount),
            status: Mutex::new(status),
            details_error: Mutex::new(None),
            scripts: Mutex::new(VecDeque::new()),
            details_calls: AtomicU32::new(0),
            withdraw_calls: AtomicU32::new(0),
        }
    }

    pub fn with_script(self, script: Script) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    pub fn failing_details(self, message: &str) -> Self {
        *self.details_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn details_calls(&self) -> u32 {
        self.details_calls.load(Ordering::SeqCst)
    }

    pub fn withdraw_calls(&self) -> u32 {
        self.withdraw_calls.load(Ordering::SeqCst)
    }
}

impl WalletClient for MockWallet {
    fn account(&self) -> Address {
        self.account
    }

    async fn get_withdraw_details(&self, code: &str) -> BlockchainResult<WithdrawDetails> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.details_error.lock().unwrap().clone() {
            return Err(BlockchainError::Rpc(message));
        }
        Ok(WithdrawDetails {
            amount: self.amount,
            sender: self.sender,
            status: *self.status.lock().unwrap(),
            hashed_code: hash_code(code),
        })
    }

    async fn withdraw(&self, _code: &str) -> Result<PendingWithdraw, SubmissionFailure> {
        self.withdraw_calls.fetch_add(1, Ordering::SeqCst);
        let (script, remaining) = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.pop_front().expect("withdraw called without a script");
            (script, scripts.len())
        };

        let pending = match script {
            Script::Confirm(hash) => PendingWithdraw::new(hash, async { Ok(()) }),
            Script::LateFailure(hash, message) => {
                PendingWithdraw::new(hash, async move { Err(BlockchainError::Reverted(message)) })
            }
            Script::Gated(hash, rx) => PendingWithdraw::new(hash, async move {
                rx.await
                    .unwrap_or_else(|_| Err(BlockchainError::Rpc("gate dropped".into())))
            }),
            Script::RejectAfterHash(hash, message) => {
                return Err(SubmissionFailure::after_hash(hash, BlockchainError::Rpc(message)))
            }
            Script::RejectBeforeHash(message) => {
                return Err(SubmissionFailure::before_hash(BlockchainError::Wallet(message)))
            }
        };

        if remaining == 0 {
            *self.status.lock().unwrap() = WithdrawStatus::Completed;
        }
        Ok(pending)
    }
}

/// A call observed by [`RecordingLedger`].
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    Enqueue(TransactionEvent),
    MarkError(Option<TxHash>),
}

/// Ledger that only records what it was asked to do.
#[derive(Default)]
pub struct RecordingLedger {
    calls: Mutex<Vec<LedgerCall>>,
}

#[allow(dead_code)]
impl RecordingLedger {
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn enqueued(&self) -> Vec<TransactionEvent> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LedgerCall::Enqueue(e) => Some(e),
                LedgerCall::MarkError(_) => None,
            })
            .collect()
    }

    pub fn error_marks(&self) -> Vec<Option<TxHash>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LedgerCall::MarkError(h) => Some(h),
                LedgerCall::Enqueue(_) => None,
            })
            .collect()
    }
}

impl TransactionLedger for RecordingLedger {
    async fn enqueue(&self, event: TransactionEvent) -> LedgerResult<()> {
        self.calls.lock().unwrap().push(LedgerCall::Enqueue(event));
        Ok(())
    }

    async fn mark_with_error_event(&self, tx_hash: Option<TxHash>) -> LedgerResult<()> {
        self.calls.lock().unwrap().push(LedgerCall::MarkError(tx_hash));
        Ok(())
    }
}
