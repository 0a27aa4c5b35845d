use std::sync::Arc;

use rust_decimal::Decimal;

use payment_hub_core::application::ledger::LedgerService;
use payment_hub_core::application::payments::PaymentService;
use payment_hub_core::domain::payment::{AccountId, CreatePayment, UserId};
use payment_hub_core::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryPaymentStore};

pub fn payment_service() -> Arc<PaymentService> {
    Arc::new(PaymentService::new(Box::new(InMemoryPaymentStore::new())))
}

pub fn ledger_service() -> Arc<LedgerService> {
    Arc::new(LedgerService::new(Box::new(InMemoryLedgerStore::new())))
}

pub fn create_request(user_id: UserId, account_id: AccountId, amount: Decimal) -> CreatePayment {
    CreatePayment {
        user_id: Some(user_id),
        bill_id: Some(1),
        account_id: Some(account_id),
        amount: Some(amount),
        currency: None,
        payment_method: Some("CREDIT_CARD".to_string()),
    }
}
