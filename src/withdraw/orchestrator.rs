//! Withdraw orchestration for a single payment-link claim.

use alloy::primitives::TxHash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::ledger::{OtplStatus, TransactionEvent, TransactionLedger, WithdrawEventData};
use crate::observability::metrics;
use crate::withdraw::client::{Confirmation, WalletClient};
use crate::withdraw::error::WithdrawError;
use crate::withdraw::types::{Receipt, WithdrawDetails, WithdrawStatus};

/// Coordinates wallet calls and ledger updates for withdraw attempts.
///
/// Each submitted withdrawal gets a detached task that records it in the
/// ledger and then follows it until mined. The tasks are runtime-owned:
/// dropping the orchestrator does not cancel them, but a process that is
/// about to exit should call [`Self::flush`] (or [`Self::settle`]) first.
pub struct WithdrawOrchestrator<W, L> {
    wallet: Arc<W>,
    ledger: Arc<L>,
    /// Signals from settlement tasks once their ledger record is written.
    recorded: Mutex<Vec<oneshot::Receiver<()>>>,
    settlements: Mutex<Vec<JoinHandle<()>>>,
}

impl<W, L> WithdrawOrchestrator<W, L>
where
    W: WalletClient,
    L: TransactionLedger + 'static,
{
    pub fn new(wallet: Arc<W>, ledger: Arc<L>) -> Self {
        Self {
            wallet,
            ledger,
            recorded: Mutex::new(Vec::new()),
            settlements: Mutex::new(Vec::new()),
        }
    }

    /// Claim the payment behind `code` for the active account.
    ///
    /// Resolves as soon as the withdrawal has a transaction hash; mining is
    /// followed in the background (see [`Self::settle`]).
    pub async fn execute_withdraw(
        &self,
        code: &str,
        reason: &str,
        category: &str,
    ) -> Result<Receipt, WithdrawError> {
        let span = tracing::info_span!(
            "withdraw",
            attempt_id = %Uuid::new_v4(),
            code,
            reason,
            category
        );

        async {
            tracing::info!("executeWithdraw");

            let mut details = None;
            let result = self.run(code, reason, category, &mut details).await;

            match &result {
                Ok(receipt) => {
                    metrics::record_withdraw_attempt(if receipt.is_submitted() {
                        "submitted"
                    } else {
                        "unchanged"
                    });
                }
                Err(e) => {
                    metrics::record_withdraw_attempt(e.outcome());
                    log_failure(e, details.as_ref());
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        code: &str,
        reason: &str,
        category: &str,
        details_out: &mut Option<WithdrawDetails>,
    ) -> Result<Receipt, WithdrawError> {
        if code.is_empty() {
            return Err(WithdrawError::InvalidCode);
        }

        let details = self
            .wallet
            .get_withdraw_details(code)
            .await
            .map_err(WithdrawError::DetailsFetch)?;
        *details_out = Some(details.clone());

        tracing::debug!(
            amount = %details.amount,
            sender = %details.sender,
            status = %details.status,
            hashed_code = %details.hashed_code,
            "Fetched withdraw details"
        );

        if details.sender == self.wallet.account() {
            return Err(WithdrawError::SelfWithdraw);
        }

        if details.status != WithdrawStatus::Pending {
            tracing::info!(status = %details.status, "Payment link is not pending, nothing to do");
            return Ok(Receipt::unchanged(details.status));
        }

        let pending = match self.wallet.withdraw(code).await {
            Ok(pending) => pending,
            Err(failure) => {
                if let Err(e) = self.ledger.mark_with_error_event(failure.tx_hash).await {
                    tracing::warn!(error = %e, "Failed to mark ledger entry as errored");
                }
                return Err(WithdrawError::Submission {
                    tx_hash: failure.tx_hash,
                    source: failure.error,
                });
            }
        };

        let tx_hash = pending.tx_hash;
        tracing::info!(tx_hash = %tx_hash, "Withdraw accepted by network");

        let event = TransactionEvent::withdraw(
            tx_hash,
            WithdrawEventData {
                from: details.sender,
                amount: details.amount,
                code: code.to_string(),
                hashed_code: details.hashed_code,
                reason: reason.to_string(),
                category: category.to_string(),
                otpl_status: OtplStatus::Completed,
            },
        );
        self.spawn_settlement(event, pending.confirmation);

        Ok(Receipt::submitted(details.status, tx_hash))
    }

    fn spawn_settlement(&self, event: TransactionEvent, confirmation: Confirmation) {
        let tx_hash = event.id;
        let (recorded_tx, recorded_rx) = oneshot::channel();
        let task = settle_withdraw(Arc::clone(&self.ledger), event, confirmation, recorded_tx);
        let handle = tokio::spawn(task.in_current_span());

        {
            let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop signals that already fired so the list does not grow across attempts.
            recorded.retain_mut(|rx| matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)));
            recorded.push(recorded_rx);
        }

        let mut settlements = self.settlements.lock().unwrap_or_else(PoisonError::into_inner);
        settlements.retain(|handle| !handle.is_finished());
        settlements.push(handle);
        tracing::debug!(tx_hash = %tx_hash, outstanding = settlements.len(), "Settlement task spawned");
    }

    /// Wait until every submitted withdrawal has its ledger record written.
    ///
    /// Does not wait for mining. Returns the number of records awaited.
    pub async fn flush(&self) -> usize {
        let pending = std::mem::take(&mut *self.recorded.lock().unwrap_or_else(PoisonError::into_inner));
        let count = pending.len();
        for rx in pending {
            // A closed channel means the task ended early; it already logged why.
            let _ = rx.await;
        }
        count
    }

    /// Wait for every outstanding settlement task to finish.
    ///
    /// Withdrawals submitted while this runs are left for the next call.
    /// Returns the number of tasks awaited.
    pub async fn settle(&self) -> usize {
        let handles = std::mem::take(&mut *self.settlements.lock().unwrap_or_else(PoisonError::into_inner));
        let settled = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Settlement task panicked");
            }
        }
        settled
    }
}

async fn settle_withdraw<L: TransactionLedger>(
    ledger: Arc<L>,
    event: TransactionEvent,
    confirmation: Confirmation,
    recorded: oneshot::Sender<()>,
) {
    let tx_hash: TxHash = event.id;

    if let Err(e) = ledger.enqueue(event).await {
        tracing::warn!(tx_hash = %tx_hash, error = %e, "Failed to enqueue withdraw transaction");
    }
    let _ = recorded.send(());

    match confirmation.await {
        Ok(()) => tracing::info!(tx_hash = %tx_hash, "Withdraw confirmed"),
        Err(error) => {
            metrics::record_late_failure();
            tracing::error!(
                tx_hash = %tx_hash,
                error = %error,
                error_category = "blockchain",
                "Withdraw failed after submission"
            );
            if let Err(e) = ledger.mark_with_error_event(Some(tx_hash)).await {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Failed to mark ledger entry as errored");
            }
        }
    }
}

fn log_failure(error: &WithdrawError, details: Option<&WithdrawDetails>) {
    let error_category = error.category().as_str();
    match details {
        Some(d) => tracing::error!(
            amount = %d.amount,
            sender = %d.sender,
            status = %d.status,
            hashed_code = %d.hashed_code,
            error_category,
            error = %error,
            "code withdraw failed"
        ),
        None => tracing::error!(error_category, error = %error, "code withdraw failed"),
    }
}
