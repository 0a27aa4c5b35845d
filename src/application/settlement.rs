use std::sync::Arc;

use tracing::{info, warn};

use crate::application::ledger::LedgerService;
use crate::application::payments::PaymentService;
use crate::domain::ledger::{EntryType, LedgerEntry};
use crate::domain::payment::{PaymentId, PaymentStatus};
use crate::error::Result;

/// Outcome of one settlement batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub settled: u32,
    pub failed: u32,
}

/// Orchestrates the cross-entity unit of work: moving a payment to SETTLED
/// and appending the matching ledger entry.
///
/// The two engines stay composable participants; this service owns the
/// sequencing. A payment whose ledger append fails is parked in FAILED, so no
/// path leaves a SETTLED payment without its entry.
pub struct SettlementService {
    payments: Arc<PaymentService>,
    ledger: Arc<LedgerService>,
}

impl SettlementService {
    pub fn new(payments: Arc<PaymentService>, ledger: Arc<LedgerService>) -> Self {
        Self { payments, ledger }
    }

    /// Settles one payment: debit the payment's account with a
    /// server-computed balance, then mark the payment SETTLED.
    pub async fn settle(&self, payment_id: PaymentId) -> Result<LedgerEntry> {
        let payment = self
            .payments
            .transition(payment_id, PaymentStatus::Processing)
            .await?;

        let amount = payment.amount.value();
        let prior = self.ledger.current_balance(payment.account_id).await?;
        let append = self
            .ledger
            .record_transaction(
                &payment,
                payment.account_id,
                EntryType::Debit,
                amount,
                prior - amount,
                format!("Settlement of {}", payment.transaction_reference),
            )
            .await;

        match append {
            Ok(entry) => {
                self.payments
                    .transition(payment_id, PaymentStatus::Settled)
                    .await?;
                info!(payment_id, entry_id = entry.id, "payment settled");
                Ok(entry)
            }
            Err(err) => {
                warn!(payment_id, error = %err, "settlement failed, marking payment FAILED");
                self.payments
                    .transition(payment_id, PaymentStatus::Failed)
                    .await?;
                Err(err)
            }
        }
    }

    /// Drains the pending feed through [`Self::settle`], oldest first.
    pub async fn run_batch(&self) -> Result<BatchOutcome> {
        let pending = self.payments.pending_for_batch().await?;
        let mut outcome = BatchOutcome::default();
        for payment in pending {
            match self.settle(payment.id).await {
                Ok(_) => outcome.settled += 1,
                Err(_) => outcome.failed += 1,
            }
        }
        info!(
            settled = outcome.settled,
            failed = outcome.failed,
            "settlement batch complete"
        );
        Ok(outcome)
    }
}
