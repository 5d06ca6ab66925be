//! Pass-through routes to the scan service and the payment gateway.
//!
//! These keep the upstream API key and base URLs on the server. Upstream
//! statuses and bodies are relayed as they come back.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::warn;

use sentinel_core::ContentType;

use super::error::ApiError;
use super::state::AppState;
use crate::clients::{InitPayment, PaymentError};

/// `POST /api/scan/{kind}`
pub async fn scan(
    Path(kind): Path<String>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let kind = kind
        .parse::<ContentType>()
        .ok()
        .filter(|k| *k != ContentType::Qr)
        .ok_or_else(|| ApiError::not_found(format!("Unknown scan kind: {kind}")))?;

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;

    match state.scan_client.forward(kind, &payload).await {
        Ok((status, text)) => Ok((
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            [(header::CONTENT_TYPE, "application/json")],
            text,
        )
            .into_response()),
        Err(e) => {
            warn!(%kind, error = %e, "Scan proxy request failed");
            Err(ApiError::bad_request(e.to_string()))
        }
    }
}

/// `POST /api/paystack/init`
pub async fn paystack_init(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: InitPayment = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;

    match state.payments.initialize_payment(&request).await {
        Ok(auth) => Ok(Json(auth).into_response()),
        Err(e) => Ok(relay_failure(e)),
    }
}

/// `GET /api/paystack/verify/{reference}`
pub async fn paystack_verify(
    Path(reference): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.payments.verify_payment(&reference).await {
        Ok(verified) => Json(json!({ "verified": verified })).into_response(),
        Err(e) => relay_failure(e),
    }
}

/// Upstream rejections go back with their own status and text body.
fn relay_failure(e: PaymentError) -> Response {
    match e {
        PaymentError::InitFailed { status, body } | PaymentError::VerifyFailed { status, body } => {
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            )
                .into_response()
        }
        other => ApiError::from(other).into_response(),
    }
}
