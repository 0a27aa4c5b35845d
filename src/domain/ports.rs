use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::ledger::{EntryType, LedgerEntry, LedgerEntryId, NewLedgerEntry};
use crate::domain::payment::{
    AccountId, BillId, NewPayment, Payment, PaymentId, PaymentStatus, StatusChange, UserId,
};
use crate::error::{PaymentError, Result};

/// Zero-based offset pagination for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(PaymentError::validation("page size must be greater than 0"));
        }
        Ok(Self { page, size })
    }

    pub fn offset(&self) -> usize {
        self.page * self.size
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// Repository port for payment rows.
///
/// Implementations own identity assignment and the unique index on the
/// transaction reference; every method may fail with `Storage` when the
/// backend is unavailable.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a new payment and returns it with its assigned identity.
    async fn insert(&self, payment: NewPayment) -> Result<Payment>;
    /// Replaces an existing payment row.
    async fn update(&self, payment: Payment) -> Result<Payment>;
    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;
    /// Removes the row. Returns whether a row existed.
    async fn remove(&self, id: PaymentId) -> Result<bool>;
    /// Payments of one user in a stable (created_at, id) order, paged.
    async fn find_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Vec<Payment>>;
    async fn find_by_bill(&self, bill_id: BillId) -> Result<Vec<Payment>>;
    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Payment>>;
    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>>;
    async fn find_by_user_and_status(
        &self,
        user_id: UserId,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>>;
    /// Payments whose payment_date falls within [start, end].
    async fn find_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Payment>>;
    /// INITIATED payments, created_at ascending — the settlement batch feed.
    async fn find_pending_for_batch(&self) -> Result<Vec<Payment>>;
    async fn count_by_user(&self, user_id: UserId) -> Result<u64>;
}

/// Repository port for the append-only ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends an entry for an account.
    ///
    /// `expected_tip` is the id of the entry the caller observed as the
    /// account's latest (None for a fresh account). The append fails with
    /// `Consistency` when another entry landed in between, which serializes
    /// writers per account without blocking other accounts.
    async fn append(
        &self,
        entry: NewLedgerEntry,
        expected_tip: Option<LedgerEntryId>,
    ) -> Result<LedgerEntry>;
    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>>;
    async fn find_by_account_and_type(
        &self,
        account_id: AccountId,
        entry_type: EntryType,
    ) -> Result<Vec<LedgerEntry>>;
    async fn find_by_payment(&self, payment_id: PaymentId) -> Result<Vec<LedgerEntry>>;
    /// Entries with created_at in [start, end), newest first (statements).
    async fn find_by_account_between(
        &self,
        account_id: AccountId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>>;
    /// The most recent entry for the account, by (created_at, id).
    async fn latest_for_account(&self, account_id: AccountId) -> Result<Option<LedgerEntry>>;
    /// Sum of amounts of the given type; zero for an empty account.
    async fn sum_by_type(&self, account_id: AccountId, entry_type: EntryType) -> Result<Decimal>;
    async fn count_by_account(&self, account_id: AccountId) -> Result<u64>;
}

/// Extension point invoked synchronously after a successful payment status
/// change. Delivery to fraud-detection/notification consumers lives outside
/// the core; implementations must not fail the transition.
#[async_trait]
pub trait StatusChangedHook: Send + Sync {
    async fn status_changed(&self, change: StatusChange);
}

#[async_trait]
impl<T: StatusChangedHook + ?Sized> StatusChangedHook for std::sync::Arc<T> {
    async fn status_changed(&self, change: StatusChange) {
        (**self).status_changed(change).await;
    }
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type StatusChangedHookBox = Box<dyn StatusChangedHook>;
