//! Client for the remote scan service.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

use sentinel_core::config::ScanApiConfig;
use sentinel_core::{ContentType, ErrorCode};

use super::types::ScanVerdict;
use super::{install_crypto_provider, with_trailing_slash};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum ScanApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx from the scan service. The body is shown to the user as is.
    #[error("{}", request_failed_message(.body))]
    RequestFailed { status: u16, body: String },

    #[error("{0} scans are not handled by the scan service")]
    UnsupportedKind(ContentType),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn request_failed_message(body: &str) -> &str {
    if body.is_empty() { "Request failed" } else { body }
}

impl ErrorCode for ScanApiError {
    fn code(&self) -> Option<&'static str> {
        match self {
            Self::RequestFailed { .. } => Some("scan_request_failed"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScanClient {
    pub fn new(config: &ScanApiConfig) -> Result<Self, ScanApiError> {
        if config.base_url.is_empty() {
            return Err(ScanApiError::Config("scan API base_url is empty".into()));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| ScanApiError::Config("Invalid API key format".into()))?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        install_crypto_provider();
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: with_trailing_slash(&config.base_url),
        })
    }

    fn endpoint(&self, kind: &str) -> String {
        format!("{}scan/{kind}", self.base_url)
    }

    pub async fn scan_text(&self, text: &str) -> Result<ScanVerdict, ScanApiError> {
        self.scan(ContentType::Text, json!({ "text": text })).await
    }

    pub async fn scan_url(&self, url: &str) -> Result<ScanVerdict, ScanApiError> {
        self.scan(ContentType::Url, json!({ "url": url })).await
    }

    pub async fn scan_email(&self, address: &str) -> Result<ScanVerdict, ScanApiError> {
        self.scan(ContentType::Email, json!({ "emailId": address }))
            .await
    }

    pub async fn scan_wallet(&self, address: &str) -> Result<ScanVerdict, ScanApiError> {
        self.scan(ContentType::Wallet, json!({ "wallet": address }))
            .await
    }

    #[instrument(skip(self, body))]
    async fn scan(&self, kind: ContentType, body: Value) -> Result<ScanVerdict, ScanApiError> {
        if kind == ContentType::Qr {
            return Err(ScanApiError::UnsupportedKind(kind));
        }

        let resp = self
            .http
            .post(self.endpoint(kind.as_str()))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Scan service rejected request");
            return Err(ScanApiError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    /// Relay a raw request body and return the upstream status and body
    /// untouched.
    pub async fn forward(
        &self,
        kind: ContentType,
        body: &Value,
    ) -> Result<(u16, String), ScanApiError> {
        if kind == ContentType::Qr {
            return Err(ScanApiError::UnsupportedKind(kind));
        }
        let resp = self
            .http
            .post(self.endpoint(kind.as_str()))
            .json(body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        Ok((status, resp.text().await?))
    }
}
