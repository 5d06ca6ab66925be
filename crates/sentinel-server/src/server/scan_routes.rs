//! Scan, history and QR side-record routes.

use axum::Json;
use axum::extract::{Path, Query};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use sentinel_core::ContentType;

use super::error::ApiError;
use super::extract::{CurrentUser, JsonBody};
use crate::billing::{ExportFormat, HistoryPage, HistoryStats};
use crate::scanner::{DEFAULT_QR_SOURCE, ScanResult};
use crate::storage::{HistoryFilters, QrScan, ScanHistory, time};

#[derive(Deserialize)]
pub struct ScanRequest {
    #[serde(rename = "type")]
    kind: ContentType,
    content: String,
}

#[derive(Deserialize)]
pub struct QrRequest {
    data: String,
    #[serde(default)]
    source: Option<String>,
}

/// `POST /api/scans`
pub async fn create_scan(
    user: CurrentUser,
    JsonBody(req): JsonBody<ScanRequest>,
) -> Result<Json<ScanResult>, ApiError> {
    let mut ctx = user.context.lock().await;
    Ok(Json(ctx.scan(req.kind, &req.content).await?))
}

/// `POST /api/scans/qr`
pub async fn create_qr_scan(
    user: CurrentUser,
    JsonBody(req): JsonBody<QrRequest>,
) -> Result<Json<ScanResult>, ApiError> {
    let source = req
        .source
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_QR_SOURCE);
    let mut ctx = user.context.lock().await;
    Ok(Json(ctx.scan_qr(&req.data, source).await?))
}

/// `GET /api/scans/latest`
pub async fn latest_scan(user: CurrentUser) -> Result<Json<Option<ScanResult>>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.scanner().latest().cloned()))
}

/// `DELETE /api/scans/latest`
pub async fn clear_latest_scan(user: CurrentUser) -> StatusCode {
    user.context.lock().await.scanner_mut().reset_result();
    StatusCode::NO_CONTENT
}

/// `GET /api/scans/recent`
pub async fn recent_scans(user: CurrentUser) -> Result<Json<Vec<ScanResult>>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.scanner().recent().iter().cloned().collect()))
}

/// `DELETE /api/scans/recent`
pub async fn clear_recent_scans(user: CurrentUser) -> StatusCode {
    user.context.lock().await.scanner_mut().clear_recent();
    StatusCode::NO_CONTENT
}

/// Query string of `GET /api/history`. Empty values mean "no filter".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    content_type: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    limit: Option<i64>,
    search: Option<String>,
}

impl HistoryQuery {
    fn into_filters(self) -> Result<HistoryFilters, ApiError> {
        let content_type = match non_empty(self.content_type) {
            Some(kind) if kind.eq_ignore_ascii_case("all") => None,
            Some(kind) => Some(
                kind.parse::<ContentType>()
                    .map_err(|e| ApiError::bad_request(e.to_string()))?,
            ),
            None => None,
        };
        Ok(HistoryFilters {
            content_type,
            date_from: parse_date(self.date_from, false)?,
            date_to: parse_date(self.date_to, true)?,
            limit: self.limit,
            search: non_empty(self.search),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_date(value: Option<String>, end_of_day: bool) -> Result<Option<i64>, ApiError> {
    non_empty(value)
        .map(|v| {
            time::parse_bound(&v, end_of_day)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid date: {v}")))
        })
        .transpose()
}

/// `GET /api/history`
pub async fn history(
    user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let filters = query.into_filters()?;
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.store().fetch_history(&filters).await))
}

/// `GET /api/history/stats`
pub async fn history_stats(user: CurrentUser) -> Result<Json<HistoryStats>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.store().history_stats().await))
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    format: Option<String>,
}

/// `GET /api/history/export?format=json|csv`
pub async fn export_history(
    user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = match non_empty(query.format) {
        Some(f) => f
            .parse::<ExportFormat>()
            .map_err(|_| ApiError::bad_request(format!("Unsupported export format: {f}")))?,
        None => ExportFormat::default(),
    };

    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    let body = ctx.store().export_history(format).await?;

    let (content_type, ext) = match format {
        ExportFormat::Json => ("application/json", "json"),
        ExportFormat::Csv => ("text/csv; charset=utf-8", "csv"),
    };
    let disposition = format!(
        "attachment; filename=\"scan-history-{}.{ext}\"",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// `GET /api/history/{id}`
pub async fn history_item(
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ScanHistory>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    ctx.store()
        .get_history_item(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Scan not found"))
}

/// `DELETE /api/history/{id}`
pub async fn delete_history_item(
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    if ctx.store().delete_history_item(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Scan not found"))
    }
}

/// `DELETE /api/history`
pub async fn clear_history(user: CurrentUser) -> Result<Json<Value>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    let deleted = ctx.store().clear_history().await?;
    Ok(Json(json!({ "deleted": deleted })))
}

#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    limit: Option<i64>,
}

/// `GET /api/qr-scans`
pub async fn qr_scans(
    user: CurrentUser,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<QrScan>>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    Ok(Json(ctx.store().get_qr_scans(query.limit).await))
}

/// `DELETE /api/qr-scans`
pub async fn clear_qr_scans(user: CurrentUser) -> Result<Json<Value>, ApiError> {
    let mut ctx = user.context.lock().await;
    ctx.ensure_loaded().await?;
    let deleted = ctx.store_mut().clear_qr_scans().await?;
    Ok(Json(json!({ "deleted": deleted })))
}
