use serde::Serialize;

use crate::error::PaymentError;

/// The standard success/error envelope carried by every response body.
///
/// `data` serializes as `null` on failure rather than being omitted, matching
/// the documented `{success, message, data}` contract.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Maps a core error to the transport pair (status, envelope).
    pub fn from_error(err: &PaymentError) -> (u16, Self) {
        (err.status_code(), Self::failure(err.to_string()))
    }
}
