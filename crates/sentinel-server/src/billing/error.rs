//! Billing errors.

use thiserror::Error;

use sentinel_core::{ErrorCode, SubscriptionStatus};

use crate::clients::PaymentError;
use crate::storage::DatabaseError;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("No profile found")]
    NotAuthenticated,

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Cannot {action} a subscription that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: SubscriptionStatus,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The history row exists but the balance was not reduced.
    #[error("Scan {scan_id} was saved but tokens could not be deducted: {source}")]
    TokenDeductionFailed {
        scan_id: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] DatabaseError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl BillingError {
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidAmount(_) | Self::InvalidTransition { .. })
    }

    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::PlanNotFound(_) => true,
            Self::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl ErrorCode for BillingError {
    fn code(&self) -> Option<&'static str> {
        match self {
            Self::NotAuthenticated => Some("not_authenticated"),
            Self::PlanNotFound(_) => Some("plan_not_found"),
            Self::InvalidTransition { .. } => Some("invalid_transition"),
            Self::InvalidAmount(_) => Some("invalid_amount"),
            Self::TokenDeductionFailed { .. } => Some("token_deduction_failed"),
            Self::Storage(e) => e.code(),
            Self::Payment(e) => e.code(),
            Self::Export(_) => None,
        }
    }
}
