//! Download status and the failure taxonomy stored on failed records.

/// Why a download failed. Stored on the record, never propagated as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    /// Completion arrived with an HTTP status outside 2xx.
    #[error("server responded with HTTP {status}")]
    ServerError { status: u16 },
    /// Network-layer failure other than cancellation.
    #[error("transport error {code}: {description}")]
    Transport { code: i32, description: String },
    /// The finished file could not be moved into place.
    #[error("I/O error: {description}")]
    Io { description: String },
    #[error("unknown error {code}: {description}")]
    Unknown { code: i32, description: String },
    /// Reserved for multi-part downloads; nothing constructs it yet.
    #[error("{} errors", .0.len())]
    Aggregate(Vec<FailureKind>),
}

/// Lifecycle state of a download record.
///
/// `Idle → Downloading` happens only on admission by the queue;
/// `Finished` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadStatus {
    #[default]
    Idle,
    Downloading,
    Paused,
    Finished,
    Failed(FailureKind),
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Idle => "idle",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Finished => "finished",
            DownloadStatus::Failed(_) => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, DownloadStatus::Finished)
    }

    /// Idle or downloading: still owed work by the queue.
    pub fn is_active(&self) -> bool {
        matches!(self, DownloadStatus::Idle | DownloadStatus::Downloading)
    }

    pub fn failure(&self) -> Option<&FailureKind> {
        match self {
            DownloadStatus::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStatus::Failed(kind) => write!(f, "failed ({kind})"),
            other => f.write_str(other.as_str()),
        }
    }
}
