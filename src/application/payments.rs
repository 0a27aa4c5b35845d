use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::money::Amount;
use crate::domain::payment::{
    AccountId, BillId, CreatePayment, NewPayment, Payment, PaymentId, PaymentStatus, StatusChange,
    TransactionReference, UserId,
};
use crate::domain::ports::{PageRequest, PaymentStoreBox, StatusChangedHookBox};
use crate::error::{PaymentError, Result};

/// The payment lifecycle engine.
///
/// Creates payments, enforces the status transition table, and exposes the
/// batch-pending feed consumed by settlement. Owns no state beyond the
/// injected store handle and the optional status-changed hook.
pub struct PaymentService {
    store: PaymentStoreBox,
    hook: Option<StatusChangedHookBox>,
}

impl PaymentService {
    pub fn new(store: PaymentStoreBox) -> Self {
        Self { store, hook: None }
    }

    /// Attaches the hook fired after every successful status change.
    pub fn with_hook(store: PaymentStoreBox, hook: StatusChangedHookBox) -> Self {
        Self {
            store,
            hook: Some(hook),
        }
    }

    /// Creates a payment in INITIATED state with a generated `TXN-<uuid>`
    /// reference and server-assigned timestamps.
    pub async fn create(&self, request: CreatePayment) -> Result<Payment> {
        let raw_amount = request
            .amount
            .ok_or_else(|| PaymentError::validation("amount is required"))?;
        let amount = Amount::new(raw_amount)?;
        let user_id = request
            .user_id
            .ok_or_else(|| PaymentError::validation("user id is required"))?;
        let bill_id = request
            .bill_id
            .ok_or_else(|| PaymentError::validation("bill id is required"))?;
        let account_id = request
            .account_id
            .ok_or_else(|| PaymentError::validation("account id is required"))?;
        let payment_method = request
            .payment_method
            .filter(|method| !method.trim().is_empty())
            .ok_or_else(|| PaymentError::validation("payment method is required"))?;

        let now = Utc::now();
        let payment = NewPayment {
            user_id,
            bill_id,
            account_id,
            amount,
            currency: request.currency.unwrap_or_else(|| "USD".to_string()),
            payment_date: now,
            payment_method,
            status: PaymentStatus::Initiated,
            transaction_reference: TransactionReference::generate(),
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.insert(payment).await?;
        debug!(
            payment_id = saved.id,
            reference = %saved.transaction_reference,
            "payment created"
        );
        Ok(saved)
    }

    pub async fn get(&self, id: PaymentId) -> Result<Payment> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::not_found(format!("payment {id}")))
    }

    /// One page of a user's payments in a stable (created_at, id) order.
    pub async fn list_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Vec<Payment>> {
        self.store.find_by_user(user_id, page).await
    }

    pub async fn list_by_bill(&self, bill_id: BillId) -> Result<Vec<Payment>> {
        self.store.find_by_bill(bill_id).await
    }

    pub async fn list_by_account(&self, account_id: AccountId) -> Result<Vec<Payment>> {
        self.store.find_by_account(account_id).await
    }

    /// Payments with the given status; the raw string is parsed
    /// case-insensitively and rejected with a validation error when unknown.
    pub async fn list_by_status(&self, raw_status: &str) -> Result<Vec<Payment>> {
        let status: PaymentStatus = raw_status.parse()?;
        self.store.find_by_status(status).await
    }

    pub async fn list_by_user_and_status(
        &self,
        user_id: UserId,
        raw_status: &str,
    ) -> Result<Vec<Payment>> {
        let status: PaymentStatus = raw_status.parse()?;
        self.store.find_by_user_and_status(user_id, status).await
    }

    /// Payments whose payment_date falls within [start, end].
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Payment>> {
        self.store.find_between(start, end).await
    }

    pub async fn count_for_user(&self, user_id: UserId) -> Result<u64> {
        self.store.count_by_user(user_id).await
    }

    /// Parses and applies a status change requested over the wire.
    pub async fn update_status(&self, id: PaymentId, raw_status: &str) -> Result<Payment> {
        let status: PaymentStatus = raw_status.parse()?;
        self.transition(id, status).await
    }

    /// Moves a payment to `new_status`, enforcing the transition table.
    ///
    /// The status-changed hook fires synchronously after the save, but only
    /// for an actual change; same-status no-ops stay silent.
    pub async fn transition(&self, id: PaymentId, new_status: PaymentStatus) -> Result<Payment> {
        let mut payment = self.get(id).await?;
        let old_status = payment.status;
        if !old_status.can_transition_to(new_status) {
            return Err(PaymentError::validation(format!(
                "illegal status transition {old_status} -> {new_status} for payment {id}"
            )));
        }

        payment.status = new_status;
        payment.updated_at = Utc::now();
        let saved = self.store.update(payment).await?;
        info!(payment_id = id, %old_status, %new_status, "payment status changed");

        if old_status != new_status
            && let Some(hook) = &self.hook
        {
            hook.status_changed(StatusChange {
                payment_id: id,
                old_status,
                new_status,
                payment: saved.clone(),
            })
            .await;
        }

        Ok(saved)
    }

    /// Deletes a payment. Only INITIATED payments may be removed; anything
    /// that has started settling stays on the books.
    pub async fn delete(&self, id: PaymentId) -> Result<()> {
        let payment = self.get(id).await?;
        if payment.status != PaymentStatus::Initiated {
            return Err(PaymentError::validation(format!(
                "only INITIATED payments can be deleted, payment {id} is {}",
                payment.status
            )));
        }
        self.store.remove(id).await?;
        info!(payment_id = id, "payment deleted");
        Ok(())
    }

    /// All INITIATED payments, oldest first — the settlement batch feed.
    pub async fn pending_for_batch(&self) -> Result<Vec<Payment>> {
        self.store.find_pending_for_batch().await
    }
}
