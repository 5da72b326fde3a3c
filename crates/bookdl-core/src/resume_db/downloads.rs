//! Download rows: add, list, get, state, destination, remove.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::db::{unix_timestamp, ResumeDb};
use super::types::{DownloadRowId, StoredDownload, StoredState};
use crate::record::DownloadRequest;

const SELECT_DOWNLOAD: &str = r#"
    SELECT id, url, method, headers_json, state, destination, failure,
           created_at, updated_at
    FROM downloads
"#;

fn stored_download(row: &SqliteRow) -> Result<StoredDownload> {
    let headers_json: String = row.get("headers_json");
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    let state: String = row.get("state");
    Ok(StoredDownload {
        id: row.get("id"),
        request: DownloadRequest {
            url: row.get("url"),
            method: row.get("method"),
            headers,
        },
        state: StoredState::from_str(&state),
        destination: row.get("destination"),
        failure: row.get("failure"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl ResumeDb {
    /// Insert a new queued download.
    pub async fn add_download(&self, request: &DownloadRequest) -> Result<DownloadRowId> {
        let now = unix_timestamp();
        let headers_json = serde_json::to_string(&request.headers)?;

        let row_id = sqlx::query(
            r#"
            INSERT INTO downloads (
                url, method, headers_json, state,
                destination, failure, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5, ?6)
            "#,
        )
        .bind(&request.url)
        .bind(&request.method)
        .bind(headers_json)
        .bind(StoredState::Queued.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Every download, oldest first (queue order).
    pub async fn list_downloads(&self) -> Result<Vec<StoredDownload>> {
        let rows = sqlx::query(&format!("{SELECT_DOWNLOAD} ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(stored_download).collect()
    }

    pub async fn get_download(&self, id: DownloadRowId) -> Result<Option<StoredDownload>> {
        let row = sqlx::query(&format!("{SELECT_DOWNLOAD} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(stored_download).transpose()
    }

    /// Update the state; `failure` replaces the stored failure text (pass
    /// `None` to clear it).
    pub async fn set_state(
        &self,
        id: DownloadRowId,
        state: StoredState,
        failure: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE downloads
            SET state = ?1,
                failure = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(state.as_str())
        .bind(failure)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_destination(&self, id: DownloadRowId, destination: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE downloads
            SET destination = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(destination)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete the row and its resume data. Returns whether a row existed.
    /// Files on disk are the caller's business.
    pub async fn remove_download(&self, id: DownloadRowId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM resume_data WHERE download_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM downloads WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed > 0)
    }

    /// Downloads left `downloading` by a process that died go back to
    /// `queued`. Returns how many were reset.
    pub async fn recover_interrupted(&self) -> Result<u64> {
        let done = sqlx::query(
            r#"
            UPDATE downloads
            SET state = ?1,
                updated_at = ?2
            WHERE state = ?3
            "#,
        )
        .bind(StoredState::Queued.as_str())
        .bind(unix_timestamp())
        .bind(StoredState::Downloading.as_str())
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected())
    }
}
