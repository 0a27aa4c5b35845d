use thiserror::Error;

pub type Result<T, E = PaymentError> = std::result::Result<T, E>;

/// Error taxonomy shared by both engines.
///
/// `Validation` and `NotFound` are caller faults. `Consistency` means a ledger
/// invariant was violated and must be treated as an alarm, never retried
/// blindly. `Storage` wraps infrastructure failures surfaced by a store; the
/// caller may retry those with backoff.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("consistency violation: {0}")]
    Consistency(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// HTTP-equivalent status for the boundary layer that owns transport.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Consistency(_) => 409,
            Self::Storage(_) => 503,
        }
    }
}
