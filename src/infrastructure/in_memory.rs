use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::ledger::{EntryType, LedgerEntry, LedgerEntryId, NewLedgerEntry};
use crate::domain::payment::{
    AccountId, BillId, NewPayment, Payment, PaymentId, PaymentStatus, UserId,
};
use crate::domain::ports::{LedgerStore, PageRequest, PaymentStore};
use crate::error::{PaymentError, Result};

fn by_creation(a: &Payment, b: &Payment) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

/// A thread-safe in-memory payment store.
///
/// Cloning shares the underlying map, matching how a pooled database handle
/// behaves; tests clone the store before boxing it into a service.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    rows: Arc<RwLock<HashMap<PaymentId, Payment>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered(&self, predicate: impl Fn(&Payment) -> bool) -> Vec<Payment> {
        let rows = self.rows.read().await;
        let mut matches: Vec<Payment> = rows.values().filter(|p| predicate(p)).cloned().collect();
        matches.sort_by(by_creation);
        matches
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: NewPayment) -> Result<Payment> {
        let mut rows = self.rows.write().await;
        // unique index on the transaction reference
        if rows
            .values()
            .any(|existing| existing.transaction_reference == payment.transaction_reference)
        {
            return Err(PaymentError::storage(format!(
                "duplicate transaction reference {}",
                payment.transaction_reference
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let payment = payment.assign_id(id);
        rows.insert(id, payment.clone());
        Ok(payment)
    }

    async fn update(&self, payment: Payment) -> Result<Payment> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&payment.id) {
            return Err(PaymentError::not_found(format!("payment {}", payment.id)));
        }
        rows.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).cloned())
    }

    async fn remove(&self, id: PaymentId) -> Result<bool> {
        let mut rows = self.rows.write().await;
        Ok(rows.remove(&id).is_some())
    }

    async fn find_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Vec<Payment>> {
        let matches = self.filtered(|p| p.user_id == user_id).await;
        Ok(matches
            .into_iter()
            .skip(page.offset())
            .take(page.size())
            .collect())
    }

    async fn find_by_bill(&self, bill_id: BillId) -> Result<Vec<Payment>> {
        Ok(self.filtered(|p| p.bill_id == bill_id).await)
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Payment>> {
        Ok(self.filtered(|p| p.account_id == account_id).await)
    }

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>> {
        Ok(self.filtered(|p| p.status == status).await)
    }

    async fn find_by_user_and_status(
        &self,
        user_id: UserId,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>> {
        Ok(self
            .filtered(|p| p.user_id == user_id && p.status == status)
            .await)
    }

    async fn find_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Payment>> {
        Ok(self
            .filtered(|p| p.payment_date >= start && p.payment_date <= end)
            .await)
    }

    async fn find_pending_for_batch(&self) -> Result<Vec<Payment>> {
        Ok(self.filtered(|p| p.status == PaymentStatus::Initiated).await)
    }

    async fn count_by_user(&self, user_id: UserId) -> Result<u64> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|p| p.user_id == user_id).count() as u64)
    }
}

/// A thread-safe in-memory ledger store.
///
/// Entries live in one append-ordered vector, so insertion order is the
/// per-account total order and the entry id breaks creation-time ties.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(
        &self,
        entry: NewLedgerEntry,
        expected_tip: Option<LedgerEntryId>,
    ) -> Result<LedgerEntry> {
        let mut entries = self.entries.write().await;
        // Optimistic per-account serialization: the tip observed by the
        // caller must still be the tip at commit time.
        let current_tip = entries
            .iter()
            .rev()
            .find(|e| e.account_id == entry.account_id)
            .map(|e| e.id);
        if current_tip != expected_tip {
            return Err(PaymentError::consistency(format!(
                "concurrent append on account {}: expected tip {expected_tip:?}, found {current_tip:?}",
                entry.account_id
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = entry.assign_id(id);
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn find_by_account_and_type(
        &self,
        account_id: AccountId,
        entry_type: EntryType,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.account_id == account_id && e.entry_type == entry_type)
            .cloned()
            .collect())
    }

    async fn find_by_payment(&self, payment_id: PaymentId) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.payment_id == payment_id)
            .cloned()
            .collect())
    }

    async fn find_by_account_between(
        &self,
        account_id: AccountId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        let mut matches: Vec<LedgerEntry> = entries
            .iter()
            .filter(|e| e.account_id == account_id && e.created_at >= start && e.created_at < end)
            .cloned()
            .collect();
        // statements read newest-first
        matches.reverse();
        Ok(matches)
    }

    async fn latest_for_account(&self, account_id: AccountId) -> Result<Option<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .find(|e| e.account_id == account_id)
            .cloned())
    }

    async fn sum_by_type(&self, account_id: AccountId, entry_type: EntryType) -> Result<Decimal> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.account_id == account_id && e.entry_type == entry_type)
            .map(|e| e.amount.value())
            .sum())
    }

    async fn count_by_account(&self, account_id: AccountId) -> Result<u64> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| e.account_id == account_id).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Amount, Balance};
    use crate::domain::payment::TransactionReference;
    use rust_decimal_macros::dec;

    fn new_payment(user_id: UserId) -> NewPayment {
        let now = Utc::now();
        NewPayment {
            user_id,
            bill_id: 1,
            account_id: 7,
            amount: Amount::new(dec!(10.00)).unwrap(),
            currency: "USD".to_string(),
            payment_date: now,
            payment_method: "CREDIT_CARD".to_string(),
            status: PaymentStatus::Initiated,
            transaction_reference: TransactionReference::generate(),
            created_at: now,
            updated_at: now,
        }
    }

    fn new_entry(account_id: AccountId, balance_after: Decimal) -> NewLedgerEntry {
        let now = Utc::now();
        NewLedgerEntry {
            payment_id: 1,
            account_id,
            entry_type: EntryType::Credit,
            amount: Amount::new(dec!(10.00)).unwrap(),
            balance_after: Balance::new(balance_after),
            description: "test".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryPaymentStore::new();
        let first = store.insert(new_payment(1)).await.unwrap();
        let second = store.insert(new_payment(1)).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_reference() {
        let store = InMemoryPaymentStore::new();
        let a = new_payment(1);
        let mut b = new_payment(1);
        b.transaction_reference = a.transaction_reference.clone();
        store.insert(a).await.unwrap();
        assert!(matches!(
            store.insert(b).await,
            Err(PaymentError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_payment_is_not_found() {
        let store = InMemoryPaymentStore::new();
        let phantom = new_payment(1).assign_id(99);
        assert!(matches!(
            store.update(phantom).await,
            Err(PaymentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_user_pages_and_filters() {
        let store = InMemoryPaymentStore::new();
        for _ in 0..3 {
            store.insert(new_payment(1)).await.unwrap();
        }
        store.insert(new_payment(2)).await.unwrap();

        let page = PageRequest::new(0, 2).unwrap();
        let first_page = store.find_by_user(1, page).await.unwrap();
        assert_eq!(first_page.len(), 2);
        assert!(first_page.iter().all(|p| p.user_id == 1));

        let page = PageRequest::new(1, 2).unwrap();
        let second_page = store.find_by_user(1, page).await.unwrap();
        assert_eq!(second_page.len(), 1);
    }

    #[tokio::test]
    async fn test_append_rejects_stale_tip() {
        let store = InMemoryLedgerStore::new();
        let first = store.append(new_entry(7, dec!(10.00)), None).await.unwrap();

        // second writer still believes the account is empty
        let stale = store.append(new_entry(7, dec!(10.00)), None).await;
        assert!(matches!(stale, Err(PaymentError::Consistency(_))));

        // chained append with the observed tip succeeds
        let chained = store
            .append(new_entry(7, dec!(20.00)), Some(first.id))
            .await;
        assert!(chained.is_ok());
    }

    #[tokio::test]
    async fn test_accounts_do_not_interfere() {
        let store = InMemoryLedgerStore::new();
        store.append(new_entry(7, dec!(10.00)), None).await.unwrap();
        // a fresh account's first append is unaffected by account 7's tip
        store.append(new_entry(8, dec!(10.00)), None).await.unwrap();
        assert_eq!(store.count_by_account(7).await.unwrap(), 1);
        assert_eq!(store.count_by_account(8).await.unwrap(), 1);
    }
}
