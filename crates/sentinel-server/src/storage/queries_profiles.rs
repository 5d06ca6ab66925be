//! Database queries for the `profiles` table.

use sentinel_core::SubscriptionStatus;
use sentinel_core::db::unix_timestamp;

use super::db::{DatabaseError, SentinelDatabase};
use super::models::UserProfile;

/// Seed values for a freshly created profile.
pub struct NewProfile<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
    pub tokens_remaining: i64,
}

impl SentinelDatabase {
    /// Insert an `inactive` profile with zero usage.
    ///
    /// A second insert for the same id fails with [`DatabaseError::Conflict`].
    pub async fn create_profile(&self, new: &NewProfile<'_>) -> Result<UserProfile, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            r"
            INSERT INTO profiles (id, email, full_name, avatar_url, tokens_remaining,
                                  tokens_used_total, subscription_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
            ",
        )
        .bind(new.id)
        .bind(new.email)
        .bind(new.full_name)
        .bind(new.avatar_url)
        .bind(new.tokens_remaining.max(0))
        .bind(SubscriptionStatus::Inactive)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_profile(new.id).await
    }

    /// Get a profile by ID.
    pub async fn get_profile(&self, id: &str) -> Result<UserProfile, DatabaseError> {
        sqlx::query_as::<_, UserProfile>("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Profile {id}")))
    }

    /// Read only the token balance.
    pub async fn get_tokens_remaining(&self, id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT tokens_remaining FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Profile {id}")))?;
        Ok(row.0)
    }

    /// Write every mutable column of `profile` and return the stored row.
    ///
    /// `updated_at` is stamped here; the caller's value is ignored.
    pub async fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile, DatabaseError> {
        sqlx::query_as::<_, UserProfile>(
            r"
            UPDATE profiles
            SET email = ?, full_name = ?, avatar_url = ?, subscription_plan_id = ?,
                tokens_remaining = ?, tokens_used_total = ?, subscription_status = ?,
                current_period_end = ?, last_scan_at = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            ",
        )
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .bind(&profile.subscription_plan_id)
        .bind(profile.tokens_remaining)
        .bind(profile.tokens_used_total)
        .bind(profile.subscription_status)
        .bind(profile.current_period_end)
        .bind(profile.last_scan_at)
        .bind(unix_timestamp())
        .bind(&profile.id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Profile {}", profile.id)))
    }
}
