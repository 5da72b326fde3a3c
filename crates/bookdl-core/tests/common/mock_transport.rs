//! Transport double: records every call and hands tests the sinks so they
//! can play the transport's part.

use std::sync::Mutex;

use bookdl_core::record::DownloadRequest;
use bookdl_core::transport::{TaskHandle, Transport, TransportSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Request(DownloadRequest),
    ResumeData(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct Started {
    pub source: Source,
    pub sink: TransportSink,
}

impl Started {
    pub fn task(&self) -> TaskHandle {
        self.sink.task()
    }

    pub fn url(&self) -> Option<&str> {
        match &self.source {
            Source::Request(request) => Some(&request.url),
            Source::ResumeData(_) => None,
        }
    }
}

#[derive(Default)]
pub struct MockTransport {
    /// Confirm each cancel right away with `resume:<generation>` bytes.
    pub confirm_cancels: bool,
    started: Mutex<Vec<Started>>,
    cancels: Mutex<Vec<TaskHandle>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirming_cancels() -> Self {
        Self {
            confirm_cancels: true,
            ..Self::default()
        }
    }

    pub fn started(&self) -> Vec<Started> {
        self.started.lock().unwrap().clone()
    }

    /// Most recent start for `url`.
    pub fn started_for(&self, url: &str) -> Started {
        self.started()
            .into_iter()
            .rev()
            .find(|s| s.url() == Some(url))
            .unwrap_or_else(|| panic!("{url} was never started"))
    }

    pub fn cancels(&self) -> Vec<TaskHandle> {
        self.cancels.lock().unwrap().clone()
    }

    pub fn resume_bytes(task: TaskHandle) -> Vec<u8> {
        format!("resume:{}", task.generation()).into_bytes()
    }
}

impl Transport for MockTransport {
    fn start(&self, request: &DownloadRequest, sink: TransportSink) {
        self.started.lock().unwrap().push(Started {
            source: Source::Request(request.clone()),
            sink,
        });
    }

    fn resume_from(&self, resume_data: &[u8], sink: TransportSink) {
        self.started.lock().unwrap().push(Started {
            source: Source::ResumeData(resume_data.to_vec()),
            sink,
        });
    }

    fn cancel(&self, task: TaskHandle) {
        self.cancels.lock().unwrap().push(task);
        if !self.confirm_cancels {
            return;
        }
        let sink = self
            .started
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.task() == task)
            .map(|s| s.sink.clone());
        if let Some(sink) = sink {
            sink.cancelled(Some(Self::resume_bytes(task)));
        }
    }
}
