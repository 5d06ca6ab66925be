//! Client for the payment gateway.

use reqwest::Url;
use thiserror::Error;
use tracing::{info, instrument};

use sentinel_core::ErrorCode;
use sentinel_core::config::PaymentsConfig;

use super::install_crypto_provider;
use super::types::{InitPayment, PaymentAuthorization, RawInitResponse, RawVerifyResponse};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{}", or_default(.body, "Failed to initialize payment"))]
    InitFailed { status: u16, body: String },

    #[error("{}", or_default(.body, "Failed to verify payment"))]
    VerifyFailed { status: u16, body: String },

    #[error("Payment gateway response is missing {0}")]
    MalformedResponse(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn or_default<'a>(body: &'a str, fallback: &'a str) -> &'a str {
    if body.is_empty() { fallback } else { body }
}

impl ErrorCode for PaymentError {
    fn code(&self) -> Option<&'static str> {
        match self {
            Self::InitFailed { .. } => Some("payment_init_failed"),
            Self::VerifyFailed { .. } => Some("payment_verify_failed"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PaymentClient {
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        let base_url = Url::parse(&super::with_trailing_slash(&config.base_url))
            .map_err(|e| PaymentError::Config(format!("invalid payments base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PaymentError::Config(
                "payments base_url cannot be a base".into(),
            ));
        }

        install_crypto_provider();
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, base_url })
    }

    /// Build `{base}paystack/{segments..}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("paystack").extend(segments);
        }
        url
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn initialize_payment(
        &self,
        request: &InitPayment,
    ) -> Result<PaymentAuthorization, PaymentError> {
        let resp = self
            .http
            .post(self.endpoint(&["init"]))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PaymentError::InitFailed {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let raw: RawInitResponse = resp.json().await?;
        let auth = raw
            .into_authorization()
            .ok_or(PaymentError::MalformedResponse("authorization_url or reference"))?;
        info!(reference = %auth.reference, "Payment initialized");
        Ok(auth)
    }

    /// True only when the gateway reports the transaction as successful.
    #[instrument(skip(self))]
    pub async fn verify_payment(&self, reference: &str) -> Result<bool, PaymentError> {
        let resp = self
            .http
            .get(self.endpoint(&["verify", reference]))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PaymentError::VerifyFailed {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let raw: RawVerifyResponse = resp.json().await?;
        Ok(raw.is_success())
    }
}
