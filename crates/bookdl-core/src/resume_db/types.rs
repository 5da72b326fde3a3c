//! Row types of the download database.

use crate::record::{DownloadId, DownloadRequest, DownloadStatus};

/// Row id; doubles as the `DownloadId` the CLI hands the coordinator.
pub type DownloadRowId = i64;

/// Last known state of a download, stored as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredState {
    Queued,
    Downloading,
    Paused,
    Finished,
    Failed,
}

impl StoredState {
    pub fn as_str(self) -> &'static str {
        match self {
            StoredState::Queued => "queued",
            StoredState::Downloading => "downloading",
            StoredState::Paused => "paused",
            StoredState::Finished => "finished",
            StoredState::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "queued" => StoredState::Queued,
            "downloading" => StoredState::Downloading,
            "paused" => StoredState::Paused,
            "finished" => StoredState::Finished,
            _ => StoredState::Failed,
        }
    }

    /// Idle records are stored as queued.
    pub fn from_status(status: &DownloadStatus) -> Self {
        match status {
            DownloadStatus::Idle => StoredState::Queued,
            DownloadStatus::Downloading => StoredState::Downloading,
            DownloadStatus::Paused => StoredState::Paused,
            DownloadStatus::Finished => StoredState::Finished,
            DownloadStatus::Failed(_) => StoredState::Failed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredDownload {
    pub id: DownloadRowId,
    pub request: DownloadRequest,
    pub state: StoredState,
    pub destination: Option<String>,
    pub failure: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StoredDownload {
    pub fn download_id(&self) -> DownloadId {
        DownloadId::from(self.id)
    }
}
