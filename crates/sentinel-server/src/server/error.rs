//! Mapping from domain errors to HTTP responses.

use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use sentinel_core::{ErrorCode, Failure, code_of, message_of};

use crate::billing::BillingError;
use crate::clients::{PaymentError, ScanApiError};
use crate::identity::IdentityError;
use crate::scanner::ScanError;
use crate::storage::DatabaseError;

/// An error response: `{"error": "...", "code": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn coded<E>(status: StatusCode, error: &E) -> Self
    where
        E: StdError + ErrorCode,
    {
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %error, "Request failed");
        }
        Self {
            status,
            message: message_of(Failure::coded(error)),
            code: code_of(Failure::coded(error)),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            code: self.code.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Upstream status when it is a usable error status, else 502.
fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

fn database_status(e: &DatabaseError) -> StatusCode {
    if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else if e.is_conflict() {
        StatusCode::CONFLICT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn payment_status(e: &PaymentError) -> StatusCode {
    match e {
        PaymentError::InitFailed { status, .. } | PaymentError::VerifyFailed { status, .. } => {
            upstream_status(*status)
        }
        PaymentError::Http(_) | PaymentError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        PaymentError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn scan_api_status(e: &ScanApiError) -> StatusCode {
    match e {
        ScanApiError::RequestFailed { status, .. } => upstream_status(*status),
        ScanApiError::UnsupportedKind(_) => StatusCode::BAD_REQUEST,
        ScanApiError::Http(_) => StatusCode::BAD_GATEWAY,
        ScanApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn billing_status(e: &BillingError) -> StatusCode {
    match e {
        BillingError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        BillingError::Storage(db) => database_status(db),
        BillingError::Payment(p) => payment_status(p),
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn identity_status(e: &IdentityError) -> StatusCode {
    match e {
        IdentityError::EmailTaken => StatusCode::CONFLICT,
        IdentityError::Storage(db) => database_status(db),
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        e if e.is_auth() => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn scan_status(e: &ScanError) -> StatusCode {
    match e {
        ScanError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ScanError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        ScanError::NoTokensAvailable | ScanError::InsufficientTokens { .. } => {
            StatusCode::PAYMENT_REQUIRED
        }
        ScanError::Remote(remote) => scan_api_status(remote),
        ScanError::Billing(billing) => billing_status(billing),
    }
}

macro_rules! impl_from_error {
    ($($ty:ty => $status:path),* $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(e: $ty) -> Self {
                    Self::coded($status(&e), &e)
                }
            }
        )*
    };
}

impl_from_error! {
    DatabaseError => database_status,
    PaymentError => payment_status,
    ScanApiError => scan_api_status,
    BillingError => billing_status,
    IdentityError => identity_status,
    ScanError => scan_status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_are_payment_required() {
        let err = ApiError::from(ScanError::InsufficientTokens {
            required: 2,
            available: 1,
        });
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.message(), "Insufficient tokens. This scan requires 2 tokens.");
        assert_eq!(err.code.as_deref(), Some("insufficient_tokens"));
    }

    #[test]
    fn remote_failure_keeps_upstream_status_and_body() {
        let err = ApiError::from(ScanError::Remote(ScanApiError::RequestFailed {
            status: 429,
            body: "slow down".into(),
        }));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.message(), "slow down");
    }

    #[test]
    fn non_error_upstream_status_becomes_bad_gateway() {
        assert_eq!(upstream_status(302), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream_status(99), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream_status(503), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn billing_errors_map_by_kind() {
        assert_eq!(
            ApiError::from(BillingError::PlanNotFound("gold".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(BillingError::InvalidAmount("0".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(BillingError::NotAuthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(BillingError::Storage(DatabaseError::Query("boom".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn identity_errors_map_by_kind() {
        assert_eq!(
            ApiError::from(IdentityError::EmailTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(IdentityError::WeakPassword(8)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(IdentityError::InvalidToken).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
