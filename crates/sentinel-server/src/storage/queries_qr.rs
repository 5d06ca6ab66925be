//! Database queries for the `qr_scans` table.

use serde_json::Value;
use sqlx::types::Json;

use sentinel_core::db::unix_timestamp;

use super::db::{DatabaseError, SentinelDatabase};
use super::models::{QrScan, QrScanType};

/// A QR side-record to append.
pub struct NewQrScan<'a> {
    pub wallet_address: &'a str,
    pub ens_domain: Option<&'a str>,
    pub scan_type: QrScanType,
    pub metadata: Value,
}

impl SentinelDatabase {
    /// Append a QR side-record. Address and ENS name are stored lowercased.
    pub async fn insert_qr_scan(
        &self,
        user_id: &str,
        scan: NewQrScan<'_>,
    ) -> Result<QrScan, DatabaseError> {
        sqlx::query_as::<_, QrScan>(
            r"
            INSERT INTO qr_scans (id, user_id, wallet_address, ens_domain, scan_type, scanned_at, metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            ",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(scan.wallet_address.to_lowercase())
        .bind(scan.ens_domain.map(str::to_lowercase))
        .bind(scan.scan_type)
        .bind(unix_timestamp())
        .bind(Json(scan.metadata))
        .fetch_one(self.pool())
        .await
        .map_err(Into::into)
    }

    /// Most recent QR side-records, newest first.
    pub async fn list_qr_scans(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<QrScan>, DatabaseError> {
        let scans = sqlx::query_as::<_, QrScan>(
            "SELECT * FROM qr_scans WHERE user_id = ? ORDER BY scanned_at DESC, rowid DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(scans)
    }

    /// Delete every QR side-record owned by `user_id`.
    pub async fn clear_qr_scans(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM qr_scans WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
