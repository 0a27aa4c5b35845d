use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::money::{Amount, Balance};
use crate::domain::payment::{AccountId, PaymentId};
use crate::error::PaymentError;

/// Store-assigned ledger entry identity. Also the tie-breaker for entries
/// sharing a creation timestamp: the per-account order is (created_at, id).
pub type LedgerEntryId = u64;

/// Direction of a ledger movement. CREDIT increases the account balance,
/// DEBIT decreases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }

    /// Applies this movement to a prior balance.
    pub fn apply(self, prior: Balance, amount: Amount) -> Balance {
        match self {
            Self::Credit => prior + amount.into(),
            Self::Debit => prior - amount.into(),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBIT" => Ok(Self::Debit),
            "CREDIT" => Ok(Self::Credit),
            other => Err(PaymentError::validation(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

/// One immutable record of money moving into or out of an account.
///
/// `balance_after` is the account's running balance immediately following
/// this entry; the ledger engine verifies it against the previous entry
/// before the append is accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub payment_id: PaymentId,
    pub account_id: AccountId,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub balance_after: Balance,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ledger entry awaiting its store-assigned identity.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub payment_id: PaymentId,
    pub account_id: AccountId,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub balance_after: Balance,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    pub fn assign_id(self, id: LedgerEntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            payment_id: self.payment_id,
            account_id: self.account_id,
            entry_type: self.entry_type,
            amount: self.amount,
            balance_after: self.balance_after,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
