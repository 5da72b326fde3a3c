//! Resume blob produced by the curl transport on cancellation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::record::DownloadRequest;

/// Everything needed to continue a transfer with a Range request.
/// Serialized as JSON; opaque to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurlResumeData {
    pub request: DownloadRequest,
    pub partial_path: PathBuf,
    /// Bytes already on disk in `partial_path`.
    pub offset: u64,
}

impl CurlResumeData {
    pub fn to_bytes(&self) -> Vec<u8> {
        // Plain strings and integers only; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        let data = CurlResumeData {
            request: DownloadRequest::get("https://example.com/a.epub").with_header("X-Token", "t"),
            partial_path: PathBuf::from("/tmp/partial/3.part"),
            offset: 4096,
        };
        let back = CurlResumeData::from_bytes(&data.to_bytes()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(CurlResumeData::from_bytes(b"not json").is_err());
    }
}
