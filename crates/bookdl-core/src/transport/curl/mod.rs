//! HTTP transport on libcurl.
//!
//! Each task runs one `Easy` transfer on a blocking thread and writes the
//! body to `<staging>/<uuid>.part`. Cancellation flips a per-task abort
//! token that the write and progress callbacks check; the transfer then
//! reports `cancelled` with a `CurlResumeData` blob so a later
//! `resume_from` can continue with a Range request.

mod classify;
mod headers;
mod resume;
mod transfer;

pub use resume::CurlResumeData;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::BookdlConfig;
use crate::record::DownloadRequest;
use crate::transport::{TaskHandle, Transport, TransportError, TransportSink};

use transfer::TransferJob;

/// libcurl knobs shared by every transfer.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when slower than `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub max_redirections: u32,
    pub user_agent: Option<String>,
    /// Minimum spacing between progress callbacks.
    pub progress_interval: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            max_redirections: 10,
            user_agent: None,
            progress_interval: Duration::from_millis(100),
        }
    }
}

impl From<&BookdlConfig> for CurlOptions {
    fn from(cfg: &BookdlConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            max_redirections: cfg.max_redirections,
            user_agent: cfg.user_agent.clone(),
            ..Self::default()
        }
    }
}

/// Registry of abort tokens for running transfers.
type AbortTokens = Arc<Mutex<HashMap<TaskHandle, Arc<AtomicBool>>>>;

pub struct CurlTransport {
    staging_dir: PathBuf,
    options: CurlOptions,
    aborts: AbortTokens,
}

impl CurlTransport {
    pub fn new(staging_dir: impl Into<PathBuf>, options: CurlOptions) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            options,
            aborts: Arc::default(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Deletes the partial file a resume blob points at. Unknown blobs and
    /// already-missing files are not errors.
    pub fn discard_resume_data(resume_data: &[u8]) -> std::io::Result<()> {
        let Ok(data) = CurlResumeData::from_bytes(resume_data) else {
            return Ok(());
        };
        match std::fs::remove_file(&data.partial_path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn launch(&self, request: DownloadRequest, partial_path: PathBuf, offset: u64, sink: TransportSink) {
        if let Err(e) = std::fs::create_dir_all(&self.staging_dir) {
            sink.failed(TransportError::other(
                e.raw_os_error().unwrap_or(-1),
                format!("create staging dir {}: {e}", self.staging_dir.display()),
            ));
            return;
        }

        let task = sink.task();
        let abort = Arc::new(AtomicBool::new(false));
        self.aborts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task, Arc::clone(&abort));

        let job = TransferJob {
            request,
            partial_path,
            offset,
            abort,
            options: self.options.clone(),
            sink,
        };
        let aborts = Arc::clone(&self.aborts);
        tokio::task::spawn_blocking(move || {
            transfer::run(job);
            aborts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&task);
        });
    }
}

impl Transport for CurlTransport {
    fn start(&self, request: &DownloadRequest, sink: TransportSink) {
        // Generations restart with every coordinator; partial files of paused
        // downloads outlive it.
        let partial_path = self
            .staging_dir
            .join(format!("{}.part", uuid::Uuid::new_v4()));
        tracing::debug!(task = %sink.task(), url = %request.url, "curl transfer starting");
        self.launch(request.clone(), partial_path, 0, sink);
    }

    fn resume_from(&self, resume_data: &[u8], sink: TransportSink) {
        match CurlResumeData::from_bytes(resume_data) {
            Ok(data) => {
                tracing::debug!(
                    task = %sink.task(),
                    offset = data.offset,
                    partial = %data.partial_path.display(),
                    "curl transfer resuming"
                );
                self.launch(data.request, data.partial_path, data.offset, sink);
            }
            Err(e) => sink.failed(TransportError::other(-1, format!("unreadable resume data: {e}"))),
        }
    }

    fn cancel(&self, task: TaskHandle) {
        let aborts = self.aborts.lock().unwrap_or_else(PoisonError::into_inner);
        match aborts.get(&task) {
            Some(token) => token.store(true, Ordering::Relaxed),
            None => tracing::debug!(%task, "cancel for a transfer that is not running"),
        }
    }
}
