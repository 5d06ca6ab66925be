//! Scan orchestration: validate, check tokens, call the scan service,
//! record, and remember the result.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use sentinel_core::ContentType;
use sentinel_core::db::unix_timestamp;

use super::error::ScanError;
use super::qr::{self, QrRoute};
use super::validate;
use crate::billing::ProfileStore;
use crate::clients::{ScanApiError, ScanClient, ScanVerdict};
use crate::storage::{NewQrScan, NewScan, QrScanType, time};

/// Characters of the raw QR payload kept in the side-record.
const QR_RAW_PREFIX_CHARS: usize = 200;

/// Source tag for QR side-records when the caller gives none.
pub const DEFAULT_QR_SOURCE: &str = "web_qr";

/// One completed scan as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub scan_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub risk_score: String,
    pub classification: String,
    pub explanation: String,
    pub recommendations: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_by: Option<String>,
    #[serde(serialize_with = "time::serialize")]
    pub timestamp: i64,
    pub tokens_used: i64,
}

pub struct Scanner {
    client: ScanClient,
    latest: Option<ScanResult>,
    recent: VecDeque<ScanResult>,
    capacity: usize,
}

impl Scanner {
    pub fn new(client: ScanClient, capacity: usize) -> Self {
        Self {
            client,
            latest: None,
            recent: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub const fn latest(&self) -> Option<&ScanResult> {
        self.latest.as_ref()
    }

    /// Newest first, at most `capacity` entries.
    pub const fn recent(&self) -> &VecDeque<ScanResult> {
        &self.recent
    }

    pub fn reset_result(&mut self) {
        self.latest = None;
    }

    pub fn clear_recent(&mut self) {
        self.recent.clear();
    }

    /// Drop all remembered results.
    pub fn reset(&mut self) {
        self.reset_result();
        self.clear_recent();
    }

    /// Check that the profile can pay for a scan of `kind` and return its cost.
    pub fn require_tokens(store: &ProfileStore, kind: ContentType) -> Result<i64, ScanError> {
        let profile = store.profile().ok_or(ScanError::NotAuthenticated)?;
        let required = kind.token_cost();

        if !store.check_token_usage() {
            return Err(ScanError::NoTokensAvailable);
        }
        if profile.tokens_remaining < required {
            return Err(ScanError::InsufficientTokens {
                required,
                available: profile.tokens_remaining,
            });
        }
        Ok(required)
    }

    pub async fn scan_text(
        &mut self,
        store: &mut ProfileStore,
        text: &str,
    ) -> Result<ScanResult, ScanError> {
        let content = validate::text(text)?;
        self.run(store, ContentType::Text, content).await
    }

    pub async fn scan_url(
        &mut self,
        store: &mut ProfileStore,
        url: &str,
    ) -> Result<ScanResult, ScanError> {
        let content = validate::url(url)?;
        self.run(store, ContentType::Url, content).await
    }

    pub async fn scan_email(
        &mut self,
        store: &mut ProfileStore,
        address: &str,
    ) -> Result<ScanResult, ScanError> {
        let content = validate::email(address)?;
        self.run(store, ContentType::Email, content).await
    }

    pub async fn scan_wallet(
        &mut self,
        store: &mut ProfileStore,
        address: &str,
    ) -> Result<ScanResult, ScanError> {
        let content = validate::wallet(address)?;
        self.run(store, ContentType::Wallet, content).await
    }

    /// Scan a decoded QR payload. Wallets found in it are also kept as a QR
    /// side-record; failing to store that record does not fail the scan.
    #[instrument(skip(self, store, raw))]
    pub async fn scan_qr(
        &mut self,
        store: &mut ProfileStore,
        raw: &str,
        source: &str,
    ) -> Result<ScanResult, ScanError> {
        match qr::route(raw) {
            QrRoute::Wallet(address) => {
                let result = self.scan_wallet(store, &address).await?;
                let metadata = json!({
                    "source": source,
                    "raw_data": raw.chars().take(QR_RAW_PREFIX_CHARS).collect::<String>(),
                    "tokens_used": result.tokens_used,
                });
                let side_record = store
                    .record_qr(NewQrScan {
                        wallet_address: &address,
                        ens_domain: None,
                        scan_type: QrScanType::Ethereum,
                        metadata,
                    })
                    .await;
                if let Err(e) = side_record {
                    warn!(scan_id = %result.scan_id, error = %e, "Failed to store QR side-record");
                }
                Ok(result)
            }
            QrRoute::Url(url) => self.scan_url(store, &url).await,
            QrRoute::Text(text) => self.scan_text(store, &text).await,
        }
    }

    /// Dispatch by content type.
    pub async fn scan(
        &mut self,
        store: &mut ProfileStore,
        kind: ContentType,
        input: &str,
    ) -> Result<ScanResult, ScanError> {
        match kind {
            ContentType::Text => self.scan_text(store, input).await,
            ContentType::Url => self.scan_url(store, input).await,
            ContentType::Email => self.scan_email(store, input).await,
            ContentType::Wallet => self.scan_wallet(store, input).await,
            ContentType::Qr => self.scan_qr(store, input, DEFAULT_QR_SOURCE).await,
        }
    }

    #[instrument(skip(self, store, content))]
    async fn run(
        &mut self,
        store: &mut ProfileStore,
        kind: ContentType,
        content: String,
    ) -> Result<ScanResult, ScanError> {
        let tokens_used = Self::require_tokens(store, kind)?;

        let verdict = match self.remote_scan(kind, &content).await {
            Ok(verdict) => verdict,
            Err(e) => {
                #[cfg(feature = "metrics")]
                sentinel_core::metrics::record_scan_failure(kind.as_str());
                return Err(e.into());
            }
        };

        let row = store
            .record_scan(
                &NewScan {
                    content: &content,
                    content_type: kind,
                    risk_score: &verdict.risk_score,
                    classification: &verdict.classification,
                    explanation: &verdict.explanation,
                    recommendations: &verdict.recommendations,
                },
                tokens_used,
            )
            .await?;

        #[cfg(feature = "metrics")]
        sentinel_core::metrics::record_scan(kind.as_str(), tokens_used.unsigned_abs());

        let result = ScanResult {
            scan_id: row.id,
            content,
            content_type: kind,
            risk_score: verdict.risk_score,
            classification: verdict.classification,
            explanation: verdict.explanation,
            recommendations: verdict.recommendations,
            detected_by: verdict.detected_by,
            timestamp: unix_timestamp(),
            tokens_used,
        };
        info!(scan_id = %result.scan_id, risk_score = %result.risk_score, "Scan recorded");

        self.latest = Some(result.clone());
        self.recent.push_front(result.clone());
        self.recent.truncate(self.capacity);
        Ok(result)
    }

    async fn remote_scan(
        &self,
        kind: ContentType,
        content: &str,
    ) -> Result<ScanVerdict, ScanApiError> {
        match kind {
            ContentType::Url => self.client.scan_url(content).await,
            ContentType::Email => self.client.scan_email(content).await,
            ContentType::Wallet => self.client.scan_wallet(content).await,
            ContentType::Text | ContentType::Qr => self.client.scan_text(content).await,
        }
    }
}
