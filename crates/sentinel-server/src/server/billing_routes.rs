//! Profile, plan, subscription and payment routes.

use axum::Json;
use axum::extract::Path;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::extract::{CurrentUser, JsonBody};
use crate::billing::{PaymentOutcome, PaymentRequest, ProfileUpdate};
use crate::storage::{PaymentRecord, SubscriptionEvent, SubscriptionPlan, UserProfile};

/// `GET /api/me`
pub async fn me(user: CurrentUser) -> Result<Json<UserProfile>, ApiError> {
    let mut ctx = user.context.lock().await;
    Ok(Json(ctx.ensure_loaded().await?.clone()))
}

/// `PATCH /api/me`
pub async fn update_me(
    user: CurrentUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.store_mut().update_profile(update).await?.clone()))
}

/// `GET /api/plans`
pub async fn plans(user: CurrentUser) -> Result<Json<Vec<SubscriptionPlan>>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.store().plans().plans().to_vec()))
}

#[derive(Deserialize)]
pub struct SubscribeRequest {
    plan: String,
}

/// `POST /api/subscription`
///
/// Opens a gateway payment for the plan. The subscription starts once the
/// payment is verified.
pub async fn subscribe(
    user: CurrentUser,
    JsonBody(req): JsonBody<SubscribeRequest>,
) -> Result<(StatusCode, Json<PaymentRecord>), ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    let record = ctx
        .store_mut()
        .start_payment(PaymentRequest {
            plan: Some(req.plan),
            ..PaymentRequest::default()
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `DELETE /api/subscription`
pub async fn cancel_subscription(user: CurrentUser) -> Result<Json<UserProfile>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.store_mut().cancel_subscription().await?.clone()))
}

/// `GET /api/subscription/history`
pub async fn subscription_history(
    user: CurrentUser,
) -> Result<Json<Vec<SubscriptionEvent>>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.store().subscription_history().await?))
}

/// `POST /api/payments`
pub async fn start_payment(
    user: CurrentUser,
    JsonBody(req): JsonBody<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentRecord>), ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    let record = ctx.store_mut().start_payment(req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/payments/pending`
pub async fn pending_payment(
    user: CurrentUser,
) -> Result<Json<Option<PaymentRecord>>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.store().pending_payment().await?))
}

#[derive(Serialize)]
pub struct VerifyResponse {
    outcome: PaymentOutcome,
    profile: UserProfile,
}

/// `POST /api/payments/{reference}/verify`
pub async fn verify_payment(
    user: CurrentUser,
    Path(reference): Path<String>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    let outcome = ctx.store_mut().verify_and_apply_payment(&reference).await?;
    let profile = ctx.ensure_loaded().await?.clone();
    Ok(Json(VerifyResponse { outcome, profile }))
}
