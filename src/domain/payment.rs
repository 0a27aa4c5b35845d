use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::money::Amount;
use crate::error::PaymentError;

/// Store-assigned payment identity.
pub type PaymentId = u64;

// Foreign identities owned by other services. Stored as opaque values only;
// no referential enforcement happens in this core.
pub type UserId = u64;
pub type BillId = u64;
pub type AccountId = u64;

/// Lifecycle states of a payment.
///
/// A payment starts in `Initiated`; settlement moves it toward one of the
/// terminal states `Settled`, `Failed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Initiated,
    Processing,
    Settled,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::Processing => "PROCESSING",
            Self::Settled => "SETTLED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Failed | Self::Cancelled)
    }

    /// Allowed-transition table. Same-status transitions are accepted as
    /// no-ops; nothing leaves a terminal state. Direct `Initiated -> Settled`
    /// is allowed so a single-step settlement does not have to round-trip
    /// through `Processing`.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (self, next) {
            (current, candidate) if current == candidate => true,
            (Initiated, Processing | Settled | Failed | Cancelled) => true,
            (Processing, Settled | Failed | Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INITIATED" => Ok(Self::Initiated),
            "PROCESSING" => Ok(Self::Processing),
            "SETTLED" => Ok(Self::Settled),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(PaymentError::validation(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

/// External-facing tracking reference, `TXN-<UUIDv4>`.
///
/// Generated once at creation and never reassigned; the UUID makes collisions
/// a uniqueness invariant rather than a probability argument, and the store
/// still enforces a unique index on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionReference(String);

impl TransactionReference {
    pub fn generate() -> Self {
        Self(format!("TXN-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub bill_id: BillId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub currency: String,
    pub payment_date: DateTime<Utc>,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub transaction_reference: TransactionReference,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment that has not been persisted yet; the store assigns its identity.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: UserId,
    pub bill_id: BillId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub currency: String,
    pub payment_date: DateTime<Utc>,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub transaction_reference: TransactionReference,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewPayment {
    pub fn assign_id(self, id: PaymentId) -> Payment {
        Payment {
            id,
            user_id: self.user_id,
            bill_id: self.bill_id,
            account_id: self.account_id,
            amount: self.amount,
            currency: self.currency,
            payment_date: self.payment_date,
            payment_method: self.payment_method,
            status: self.status,
            transaction_reference: self.transaction_reference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Creation request as it arrives from the (external) boundary layer.
///
/// Fields are optional on the wire; the lifecycle engine rejects missing ones
/// with a validation error instead of panicking on absent JSON keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    pub user_id: Option<UserId>,
    pub bill_id: Option<BillId>,
    pub account_id: Option<AccountId>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
}

/// Event handed to the status-changed hook after a successful transition.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub payment_id: PaymentId,
    pub old_status: PaymentStatus,
    pub new_status: PaymentStatus,
    pub payment: Payment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_case_insensitively() {
        assert_eq!(
            "settled".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Settled
        );
        assert_eq!(
            "Processing".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Processing
        );
        assert_eq!(
            " CANCELLED ".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Cancelled
        );
        assert!(matches!(
            "bogus".parse::<PaymentStatus>(),
            Err(PaymentError::Validation(_))
        ));
    }

    #[test]
    fn test_transition_table() {
        use PaymentStatus::*;
        assert!(Initiated.can_transition_to(Processing));
        assert!(Initiated.can_transition_to(Settled));
        assert!(Initiated.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Settled));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Initiated));
        assert!(!Settled.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Settled));
        // same-status no-op is allowed even in terminal states
        assert!(Settled.can_transition_to(Settled));
    }

    #[test]
    fn test_terminal_states() {
        use PaymentStatus::*;
        assert!(!Initiated.is_terminal());
        assert!(!Processing.is_terminal());
        assert!(Settled.is_terminal());
        assert!(Failed.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_transaction_reference_format() {
        let reference = TransactionReference::generate();
        let s = reference.as_str();
        assert!(s.starts_with("TXN-"));
        assert!(Uuid::parse_str(&s[4..]).is_ok());
    }

    #[test]
    fn test_transaction_references_are_unique() {
        let a = TransactionReference::generate();
        let b = TransactionReference::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_create_payment_deserializes_camel_case() {
        let json = r#"{"userId":1,"billId":2,"accountId":3,"amount":"10.50","paymentMethod":"CREDIT_CARD"}"#;
        let request: CreatePayment = serde_json::from_str(json).unwrap();
        assert_eq!(request.user_id, Some(1));
        assert_eq!(request.bill_id, Some(2));
        assert_eq!(request.account_id, Some(3));
        assert_eq!(request.currency, None);
        assert_eq!(request.payment_method.as_deref(), Some("CREDIT_CARD"));
    }
}
