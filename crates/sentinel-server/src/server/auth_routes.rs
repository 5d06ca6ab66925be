//! `/api/auth/*` routes.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::error::ApiError;
use super::extract::{CurrentUser, JsonBody};
use super::state::AppState;
use crate::identity::Session;

#[derive(Deserialize)]
pub struct SignUpRequest {
    email: String,
    password: String,
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
pub struct SignOutRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    email: String,
}

#[derive(Deserialize)]
pub struct ConfirmResetRequest {
    token: String,
    password: String,
}

#[derive(Deserialize)]
pub struct PasswordRequest {
    password: String,
}

/// `POST /api/auth/signup`
pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignUpRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state
        .provider
        .sign_up(&req.email, &req.password, req.full_name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /api/auth/signin`
pub async fn sign_in(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignInRequest>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.provider.sign_in(&req.email, &req.password).await?))
}

/// `POST /api/auth/signout`: revoke the refresh token (if given) and drop
/// the caller's session context.
pub async fn sign_out(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<SignOutRequest>,
) -> Result<Json<Value>, ApiError> {
    let revoked = match req.refresh_token.as_deref() {
        Some(token) => state.provider.sign_out(token).await?,
        None => false,
    };
    state.registry.end_session(&user.identity.id).await;
    Ok(Json(json!({ "signed_out": true, "revoked": revoked })))
}

/// `POST /api/auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.provider.refresh(&req.refresh_token).await?))
}

/// `POST /api/auth/reset-password`. Answers the same whether or not the
/// address is known.
pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResetRequest>,
) -> Result<StatusCode, ApiError> {
    state.provider.reset_password(&req.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /api/auth/reset-password/confirm`
pub async fn confirm_reset(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ConfirmResetRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .provider
        .complete_password_reset(&req.token, &req.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/auth/password`
pub async fn update_password(
    user: CurrentUser,
    JsonBody(req): JsonBody<PasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let ctx = user.context.lock().await;
    ctx.session().update_password(&req.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
