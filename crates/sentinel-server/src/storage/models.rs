//! Data models for Sentinel storage.
//!
//! Timestamps are stored as unix seconds and rendered as RFC 3339 when
//! serialized for API responses and exports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;

use sentinel_core::{ContentType, SubscriptionStatus};

use super::time;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub revoked: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub used: i64,
    pub created_at: i64,
}

/// Catalog entry. `id` is canonical; `key` and `name` are aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionPlan {
    pub id: String,
    pub key: String,
    pub name: String,
    pub monthly_tokens: i64,
    pub monthly_price_usd: f64,
    pub scan_price_usd: f64,
}

/// Billing profile, one per identity.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub subscription_plan_id: Option<String>,
    pub tokens_remaining: i64,
    pub tokens_used_total: i64,
    pub subscription_status: SubscriptionStatus,
    #[serde(serialize_with = "time::serialize_opt")]
    pub current_period_end: Option<i64>,
    #[serde(serialize_with = "time::serialize_opt")]
    pub last_scan_at: Option<i64>,
    #[serde(serialize_with = "time::serialize")]
    pub created_at: i64,
    #[serde(serialize_with = "time::serialize")]
    pub updated_at: i64,
    /// Resolved from `subscription_plan_id` against the loaded catalog.
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<SubscriptionPlan>,
    /// Most recent QR side-records.
    #[sqlx(skip)]
    pub qr_scans: Vec<QrScan>,
}

/// One persisted scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ScanHistory {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub risk_score: String,
    pub classification: String,
    pub explanation: String,
    pub recommendations: String,
    pub tokens_used: i64,
    #[serde(serialize_with = "time::serialize")]
    pub created_at: i64,
}

/// Fields supplied by the caller when recording a scan.
#[derive(Debug, Clone)]
pub struct NewScan<'a> {
    pub content: &'a str,
    pub content_type: ContentType,
    pub risk_score: &'a str,
    pub classification: &'a str,
    pub explanation: &'a str,
    pub recommendations: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QrScanType {
    Ethereum,
    Other,
}

/// QR-derived wallet detection.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct QrScan {
    pub id: String,
    pub user_id: String,
    pub wallet_address: String,
    pub ens_domain: Option<String>,
    pub scan_type: QrScanType,
    #[serde(serialize_with = "time::serialize")]
    pub scanned_at: i64,
    pub metadata: Json<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LedgerAction {
    Subscribed,
    Canceled,
    TokensRefilled,
}

/// Subscription-history ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SubscriptionEvent {
    pub id: String,
    pub user_id: String,
    pub plan_id: Option<String>,
    pub action: LedgerAction,
    pub tokens_added: i64,
    pub tokens_remaining: i64,
    pub metadata: Json<Value>,
    #[serde(serialize_with = "time::serialize")]
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentPurpose {
    Subscription,
    TokenPurchase,
}

impl PaymentPurpose {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::TokenPurchase => "token_purchase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Credited,
}

/// Authorization details of a gateway payment, kept until it is credited.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PaymentRecord {
    pub reference: String,
    pub user_id: String,
    pub authorization_url: String,
    pub purpose: PaymentPurpose,
    pub plan_id: Option<String>,
    pub tokens: Option<i64>,
    pub amount: f64,
    pub status: PaymentStatus,
    #[serde(serialize_with = "time::serialize")]
    pub created_at: i64,
}
