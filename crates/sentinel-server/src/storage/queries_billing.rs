//! Database queries for the plan catalog, subscription ledger and payments.

use serde_json::Value;
use sqlx::types::Json;

use sentinel_core::db::unix_timestamp;

use super::db::{DatabaseError, SentinelDatabase};
use super::models::{
    LedgerAction, PaymentPurpose, PaymentRecord, PaymentStatus, SubscriptionEvent,
    SubscriptionPlan,
};

/// One subscription-ledger row to append.
pub struct LedgerEntry<'a> {
    pub user_id: &'a str,
    pub plan_id: Option<&'a str>,
    pub action: LedgerAction,
    pub tokens_added: i64,
    pub tokens_remaining: i64,
    pub metadata: Value,
}

/// A payment accepted by the gateway but not yet credited.
pub struct NewPayment<'a> {
    pub reference: &'a str,
    pub user_id: &'a str,
    pub authorization_url: &'a str,
    pub purpose: PaymentPurpose,
    pub plan_id: Option<&'a str>,
    pub tokens: Option<i64>,
    pub amount: f64,
}

impl SentinelDatabase {
    // =========================================================================
    // Plan catalog
    // =========================================================================

    /// All plans, cheapest allowance first.
    pub async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, DatabaseError> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT id, key, name, monthly_tokens, monthly_price_usd, scan_price_usd FROM subscription_plans ORDER BY monthly_tokens ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(plans)
    }

    // =========================================================================
    // Subscription ledger
    // =========================================================================

    /// Append a ledger row.
    pub async fn append_ledger(
        &self,
        entry: LedgerEntry<'_>,
    ) -> Result<SubscriptionEvent, DatabaseError> {
        sqlx::query_as::<_, SubscriptionEvent>(
            r"
            INSERT INTO subscription_history (id, user_id, plan_id, action, tokens_added,
                                              tokens_remaining, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            ",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(entry.user_id)
        .bind(entry.plan_id)
        .bind(entry.action)
        .bind(entry.tokens_added)
        .bind(entry.tokens_remaining)
        .bind(Json(entry.metadata))
        .bind(unix_timestamp())
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Ledger rows for a user, newest first.
    pub async fn list_ledger(&self, user_id: &str) -> Result<Vec<SubscriptionEvent>, DatabaseError> {
        let events = sqlx::query_as::<_, SubscriptionEvent>(
            "SELECT * FROM subscription_history WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Store a pending payment.
    pub async fn create_payment(
        &self,
        new: &NewPayment<'_>,
    ) -> Result<PaymentRecord, DatabaseError> {
        sqlx::query_as::<_, PaymentRecord>(
            r"
            INSERT INTO payments (reference, user_id, authorization_url, purpose, plan_id,
                                  tokens, amount, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            ",
        )
        .bind(new.reference)
        .bind(new.user_id)
        .bind(new.authorization_url)
        .bind(new.purpose)
        .bind(new.plan_id)
        .bind(new.tokens)
        .bind(new.amount)
        .bind(PaymentStatus::Pending)
        .bind(unix_timestamp())
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Get a payment owned by `user_id`.
    pub async fn get_payment(
        &self,
        user_id: &str,
        reference: &str,
    ) -> Result<PaymentRecord, DatabaseError> {
        sqlx::query_as::<_, PaymentRecord>(
            "SELECT * FROM payments WHERE reference = ? AND user_id = ?",
        )
        .bind(reference)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Payment {reference}")))
    }

    /// Most recent pending payment for a user.
    pub async fn latest_pending_payment(
        &self,
        user_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        let payment = sqlx::query_as::<_, PaymentRecord>(
            "SELECT * FROM payments WHERE user_id = ? AND status = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(PaymentStatus::Pending)
        .fetch_optional(self.pool())
        .await?;

        Ok(payment)
    }

    /// Flip a pending payment to credited. Returns `false` when it was
    /// already credited, so a purchase is applied at most once.
    pub async fn mark_payment_credited(
        &self,
        user_id: &str,
        reference: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE payments SET status = ? WHERE reference = ? AND user_id = ? AND status = ?",
        )
        .bind(PaymentStatus::Credited)
        .bind(reference)
        .bind(user_id)
        .bind(PaymentStatus::Pending)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Return a credited payment to pending after its purchase could not be
    /// applied, so a later verification can retry it.
    pub async fn release_payment_credit(
        &self,
        user_id: &str,
        reference: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE payments SET status = ? WHERE reference = ? AND user_id = ? AND status = ?",
        )
        .bind(PaymentStatus::Pending)
        .bind(reference)
        .bind(user_id)
        .bind(PaymentStatus::Credited)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
