//! Transport resume blobs, one per download.

use anyhow::Result;
use sqlx::Row;

use super::db::{unix_timestamp, ResumeDb};
use super::types::DownloadRowId;

impl ResumeDb {
    /// Store (or replace) the blob. Ignored when the download row is gone,
    /// so a late cancellation cannot resurrect a removed download's data.
    /// Returns whether it was stored.
    pub async fn save_resume_data(&self, id: DownloadRowId, data: &[u8]) -> Result<bool> {
        let stored = sqlx::query(
            r#"
            INSERT OR REPLACE INTO resume_data (download_id, data, updated_at)
            SELECT ?1, ?2, ?3
            WHERE EXISTS (SELECT 1 FROM downloads WHERE id = ?1)
            "#,
        )
        .bind(id)
        .bind(data)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(stored > 0)
    }

    pub async fn load_resume_data(&self, id: DownloadRowId) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT data FROM resume_data WHERE download_id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("data")))
    }

    pub async fn load_all_resume_data(&self) -> Result<Vec<(DownloadRowId, Vec<u8>)>> {
        let rows = sqlx::query("SELECT download_id, data FROM resume_data ORDER BY download_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get("download_id"), row.get("data")))
            .collect())
    }

    pub async fn clear_resume_data(&self, id: DownloadRowId) -> Result<()> {
        sqlx::query("DELETE FROM resume_data WHERE download_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
