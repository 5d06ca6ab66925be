//! Scan pipeline errors.

use thiserror::Error;

use sentinel_core::ErrorCode;

use crate::billing::BillingError;
use crate::clients::ScanApiError;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Input rejected before any network call. The message is user-facing.
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("Please sign in to use the scanner")]
    NotAuthenticated,

    #[error("No tokens remaining. Please upgrade your subscription or refill tokens.")]
    NoTokensAvailable,

    #[error("Insufficient tokens. This scan requires {required} tokens.")]
    InsufficientTokens { required: i64, available: i64 },

    #[error(transparent)]
    Remote(#[from] ScanApiError),

    #[error(transparent)]
    Billing(#[from] BillingError),
}

impl ErrorCode for ScanError {
    fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidInput(_) => Some("invalid_input"),
            Self::NotAuthenticated => Some("not_authenticated"),
            Self::NoTokensAvailable => Some("no_tokens"),
            Self::InsufficientTokens { .. } => Some("insufficient_tokens"),
            Self::Remote(e) => e.code(),
            Self::Billing(e) => e.code(),
        }
    }
}
