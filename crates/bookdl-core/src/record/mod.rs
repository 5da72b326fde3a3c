//! Download records: identity, request target, status, and shared progress.
//!
//! A record is created by the caller and handed to the coordinator, which is
//! the only writer of its status. Clones share the same progress cell so
//! observers holding an earlier clone keep seeing live updates.

mod progress;
mod status;

pub use progress::Progress;
pub use status::{DownloadStatus, FailureKind};

use std::fmt;

/// Opaque, stable identifier of a download.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadId(String);

impl DownloadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random v4 UUID, for callers that do not supply their own ids.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DownloadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DownloadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for DownloadId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

/// What the transport should fetch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    /// HTTP method; `GET` unless the caller says otherwise.
    #[serde(default = "default_method")]
    pub method: String,
    /// Extra request headers as `(name, value)` pairs.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl DownloadRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// One queued or active download.
#[derive(Debug, Clone)]
pub struct DownloadRecord {
    id: DownloadId,
    request: DownloadRequest,
    status: DownloadStatus,
    progress: Progress,
}

impl DownloadRecord {
    /// New idle record with a generated id.
    pub fn new(request: DownloadRequest) -> Self {
        Self::with_id(DownloadId::generate(), request)
    }

    pub fn with_id(id: impl Into<DownloadId>, request: DownloadRequest) -> Self {
        Self {
            id: id.into(),
            request,
            status: DownloadStatus::Idle,
            progress: Progress::new(),
        }
    }

    pub fn id(&self) -> &DownloadId {
        &self.id
    }

    pub fn request(&self) -> &DownloadRequest {
        &self.request
    }

    pub fn status(&self) -> &DownloadStatus {
        &self.status
    }

    /// Handle to the shared progress cell (same cell for every clone).
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub(crate) fn set_status(&mut self, status: DownloadStatus) {
        self.status = status;
    }
}
