//! Database queries for the `scans_history` table.

use sentinel_core::ContentType;
use sentinel_core::db::unix_timestamp;

use super::db::{DatabaseError, SentinelDatabase};
use super::models::{NewScan, ScanHistory};

/// Newest first; rowid breaks ties between scans in the same second.
const ORDER_NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

/// Optional filters for history listings. Empty values mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct HistoryFilters {
    pub content_type: Option<ContentType>,
    /// Inclusive lower bound, unix seconds.
    pub date_from: Option<i64>,
    /// Inclusive upper bound, unix seconds.
    pub date_to: Option<i64>,
    pub limit: Option<i64>,
    /// Case-insensitive substring over content, classification and explanation.
    pub search: Option<String>,
}

impl HistoryFilters {
    fn like_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }

    fn sql_limit(&self) -> i64 {
        // SQLite treats a negative LIMIT as unbounded.
        self.limit.filter(|l| *l > 0).unwrap_or(-1)
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl SentinelDatabase {
    /// Append a scan row for `user_id`.
    pub async fn insert_scan(
        &self,
        user_id: &str,
        scan: &NewScan<'_>,
        tokens_used: i64,
    ) -> Result<ScanHistory, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query_as::<_, ScanHistory>(
            r"
            INSERT INTO scans_history (id, user_id, content, content_type, risk_score,
                                       classification, explanation, recommendations,
                                       tokens_used, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(scan.content)
        .bind(scan.content_type)
        .bind(scan.risk_score)
        .bind(scan.classification)
        .bind(scan.explanation)
        .bind(scan.recommendations)
        .bind(tokens_used)
        .bind(unix_timestamp())
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Get one scan owned by `user_id`.
    pub async fn get_scan(&self, user_id: &str, id: &str) -> Result<ScanHistory, DatabaseError> {
        sqlx::query_as::<_, ScanHistory>("SELECT * FROM scans_history WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Scan {id}")))
    }

    /// List scans newest first, matching `filters`.
    pub async fn list_scans(
        &self,
        user_id: &str,
        filters: &HistoryFilters,
    ) -> Result<Vec<ScanHistory>, DatabaseError> {
        let pattern = filters.like_pattern();
        let sql = format!(
            r"
            SELECT * FROM scans_history
            WHERE user_id = ?
              AND (? IS NULL OR content_type = ?)
              AND (? IS NULL OR created_at >= ?)
              AND (? IS NULL OR created_at <= ?)
              AND (? IS NULL
                   OR content LIKE ? ESCAPE '\'
                   OR classification LIKE ? ESCAPE '\'
                   OR explanation LIKE ? ESCAPE '\')
            {ORDER_NEWEST_FIRST}
            LIMIT ?
            "
        );

        let scans = sqlx::query_as::<_, ScanHistory>(&sql)
            .bind(user_id)
            .bind(filters.content_type)
            .bind(filters.content_type)
            .bind(filters.date_from)
            .bind(filters.date_from)
            .bind(filters.date_to)
            .bind(filters.date_to)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(filters.sql_limit())
            .fetch_all(self.pool())
            .await?;

        Ok(scans)
    }

    /// Delete one scan. Returns whether a row was removed.
    pub async fn delete_scan(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM scans_history WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every scan owned by `user_id`.
    pub async fn clear_scans(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM scans_history WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
    }

    #[test]
    fn blank_search_is_no_filter() {
        let filters = HistoryFilters {
            search: Some("   ".into()),
            ..HistoryFilters::default()
        };
        assert_eq!(filters.like_pattern(), None);
    }

    #[test]
    fn non_positive_limit_is_unbounded() {
        let mut filters = HistoryFilters::default();
        assert_eq!(filters.sql_limit(), -1);
        filters.limit = Some(0);
        assert_eq!(filters.sql_limit(), -1);
        filters.limit = Some(5);
        assert_eq!(filters.sql_limit(), 5);
    }
}
