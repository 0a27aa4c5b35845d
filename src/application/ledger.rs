use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error};

use crate::domain::ledger::{EntryType, LedgerEntry, NewLedgerEntry};
use crate::domain::money::{Amount, Balance};
use crate::domain::payment::{AccountId, Payment, PaymentId};
use crate::error::{PaymentError, Result};

use crate::domain::ports::LedgerStoreBox;

/// The account ledger engine.
///
/// Validates and appends entries, derives balances, and fails closed when the
/// caller-supplied balance snapshot disagrees with the account's history.
pub struct LedgerService {
    store: LedgerStoreBox,
}

impl LedgerService {
    pub fn new(store: LedgerStoreBox) -> Self {
        Self { store }
    }

    /// Records one DEBIT/CREDIT movement against an account.
    ///
    /// The expected balance is recomputed from the account's latest entry;
    /// a `balance_after` that disagrees fails with a consistency error, and a
    /// DEBIT that would overdraw the account fails validation. The append
    /// itself carries the observed tip so a concurrent writer on the same
    /// account loses with a consistency error instead of a lost update.
    pub async fn record_transaction(
        &self,
        payment: &Payment,
        account_id: AccountId,
        entry_type: EntryType,
        amount: Decimal,
        balance_after: Decimal,
        description: impl Into<String>,
    ) -> Result<LedgerEntry> {
        let amount = Amount::new(amount)?;
        let balance_after = Balance::new(balance_after);

        let tip = self.store.latest_for_account(account_id).await?;
        let prior = tip
            .as_ref()
            .map(|entry| entry.balance_after)
            .unwrap_or(Balance::ZERO);
        let expected = entry_type.apply(prior, amount);

        if expected < Balance::ZERO {
            return Err(PaymentError::validation(format!(
                "debit of {amount} would overdraw account {account_id} (balance {prior})"
            )));
        }
        if balance_after != expected {
            return Err(PaymentError::consistency(format!(
                "balance_after {balance_after} does not match expected {expected} \
                 for account {account_id} (prior {prior}, {entry_type} {amount})"
            )));
        }

        let now = Utc::now();
        let entry = NewLedgerEntry {
            payment_id: payment.id,
            account_id,
            entry_type,
            amount,
            balance_after,
            description: description.into(),
            created_at: now,
            updated_at: now,
        };

        let saved = self
            .store
            .append(entry, tip.map(|entry| entry.id))
            .await?;
        debug!(
            account_id,
            payment_id = payment.id,
            entry_id = saved.id,
            %entry_type,
            %amount,
            balance_after = %saved.balance_after,
            "ledger entry appended"
        );
        Ok(saved)
    }

    /// All entries for an account in chronological order.
    pub async fn account_transactions(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        self.store.find_by_account(account_id).await
    }

    /// Entries of one type; the raw string is parsed case-insensitively and
    /// rejected with a validation error when unknown.
    pub async fn account_transactions_by_type(
        &self,
        account_id: AccountId,
        raw_type: &str,
    ) -> Result<Vec<LedgerEntry>> {
        let entry_type: EntryType = raw_type.parse()?;
        self.store
            .find_by_account_and_type(account_id, entry_type)
            .await
    }

    /// Entries owned by one payment.
    pub async fn payment_transactions(&self, payment_id: PaymentId) -> Result<Vec<LedgerEntry>> {
        self.store.find_by_payment(payment_id).await
    }

    /// Statement slice: entries with created_at in [start, end), newest first.
    pub async fn account_statement(
        &self,
        account_id: AccountId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        self.store
            .find_by_account_between(account_id, start, end)
            .await
    }

    /// The most recent entry for the account; its `balance_after` is the
    /// current balance. Returning the entry keeps provenance with the number.
    pub async fn latest_balance(&self, account_id: AccountId) -> Result<LedgerEntry> {
        self.store
            .latest_for_account(account_id)
            .await?
            .ok_or_else(|| {
                PaymentError::not_found(format!("no ledger entries for account {account_id}"))
            })
    }

    /// Sum of DEBIT amounts; zero for an account with no entries.
    pub async fn total_debits(&self, account_id: AccountId) -> Result<Decimal> {
        self.store.sum_by_type(account_id, EntryType::Debit).await
    }

    /// Sum of CREDIT amounts; zero for an account with no entries.
    pub async fn total_credits(&self, account_id: AccountId) -> Result<Decimal> {
        self.store.sum_by_type(account_id, EntryType::Credit).await
    }

    /// Derived balance: credits minus debits over the whole history.
    pub async fn current_balance(&self, account_id: AccountId) -> Result<Decimal> {
        let credits = self.total_credits(account_id).await?;
        let debits = self.total_debits(account_id).await?;
        Ok(credits - debits)
    }

    pub async fn entry_count(&self, account_id: AccountId) -> Result<u64> {
        self.store.count_by_account(account_id).await
    }

    /// Cross-checks the derived balance against the latest entry's snapshot.
    ///
    /// Divergence means the append-only invariant was broken somewhere and is
    /// surfaced as a consistency alarm, not silently repaired.
    pub async fn audit_account(&self, account_id: AccountId) -> Result<Balance> {
        let derived = Balance::new(self.current_balance(account_id).await?);
        match self.store.latest_for_account(account_id).await? {
            None if derived == Balance::ZERO => Ok(Balance::ZERO),
            None => Err(PaymentError::consistency(format!(
                "account {account_id} has no entries but a derived balance of {derived}"
            ))),
            Some(latest) if latest.balance_after == derived => Ok(derived),
            Some(latest) => {
                error!(
                    account_id,
                    derived = %derived,
                    snapshot = %latest.balance_after,
                    "ledger balance divergence"
                );
                Err(PaymentError::consistency(format!(
                    "account {account_id}: derived balance {derived} diverges from \
                     latest entry snapshot {}",
                    latest.balance_after
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{NewPayment, PaymentStatus, TransactionReference};
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use rust_decimal_macros::dec;

    fn payment(id: PaymentId) -> Payment {
        let now = Utc::now();
        NewPayment {
            user_id: 1,
            bill_id: 1,
            account_id: 7,
            amount: Amount::new(dec!(100.00)).unwrap(),
            currency: "USD".to_string(),
            payment_date: now,
            payment_method: "BANK_TRANSFER".to_string(),
            status: PaymentStatus::Initiated,
            transaction_reference: TransactionReference::generate(),
            created_at: now,
            updated_at: now,
        }
        .assign_id(id)
    }

    fn service() -> LedgerService {
        LedgerService::new(Box::new(InMemoryLedgerStore::new()))
    }

    #[tokio::test]
    async fn test_record_and_latest_balance() {
        let service = service();
        let payment = payment(1);

        service
            .record_transaction(
                &payment,
                7,
                EntryType::Credit,
                dec!(1000.00),
                dec!(1000.00),
                "Opening deposit",
            )
            .await
            .unwrap();
        service
            .record_transaction(
                &payment,
                7,
                EntryType::Debit,
                dec!(100.00),
                dec!(900.00),
                "Bill settlement",
            )
            .await
            .unwrap();

        let latest = service.latest_balance(7).await.unwrap();
        assert_eq!(latest.balance_after, Balance::new(dec!(900.00)));
        assert_eq!(service.current_balance(7).await.unwrap(), dec!(900.00));
        assert_eq!(service.total_debits(7).await.unwrap(), dec!(100.00));
        assert_eq!(service.total_credits(7).await.unwrap(), dec!(1000.00));
    }

    #[tokio::test]
    async fn test_stale_balance_after_is_a_consistency_error() {
        let service = service();
        let payment = payment(1);

        service
            .record_transaction(&payment, 7, EntryType::Credit, dec!(50), dec!(50), "seed")
            .await
            .unwrap();

        let result = service
            .record_transaction(&payment, 7, EntryType::Credit, dec!(10), dec!(70), "stale")
            .await;
        assert!(matches!(result, Err(PaymentError::Consistency(_))));
    }

    #[tokio::test]
    async fn test_empty_account_totals_are_zero() {
        let service = service();
        assert_eq!(service.total_debits(42).await.unwrap(), Decimal::ZERO);
        assert_eq!(service.total_credits(42).await.unwrap(), Decimal::ZERO);
        assert_eq!(service.current_balance(42).await.unwrap(), Decimal::ZERO);
        assert!(matches!(
            service.latest_balance(42).await,
            Err(PaymentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_overdraw_is_rejected() {
        let service = service();
        let payment = payment(1);

        let result = service
            .record_transaction(
                &payment,
                7,
                EntryType::Debit,
                dec!(10.00),
                dec!(-10.00),
                "overdraw",
            )
            .await;
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }
}
