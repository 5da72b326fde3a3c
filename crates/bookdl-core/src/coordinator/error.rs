use crate::record::DownloadId;

/// Errors of coordinator commands. Download failures are not errors; they
/// are stored on the record as `DownloadStatus::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("download {0} is already queued")]
    DuplicateId(DownloadId),
    #[error("no download with id {0}")]
    NotFound(DownloadId),
    #[error("download coordinator has shut down")]
    Shutdown,
}
