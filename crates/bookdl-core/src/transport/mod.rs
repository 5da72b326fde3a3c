//! Transport seam: the collaborator that moves bytes.
//!
//! The coordinator mints a `TaskHandle` per transfer attempt and hands the
//! transport a `TransportSink` bound to that handle. Whatever thread the
//! transfer runs on, callbacks travel through the sink into the
//! coordinator's inbox, tagged with the handle, so callbacks from a
//! superseded attempt are recognised and dropped.

mod error;
mod sink;

pub mod curl;

pub use error::{classify_http_status, is_success_status, TransportError, TransportErrorKind};
pub use sink::{TransportEvent, TransportSink};

use std::fmt;

use crate::record::DownloadRequest;

/// Generation tag of one transport task. Never reused within a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle {
    generation: u64,
}

impl TaskHandle {
    pub fn new(generation: u64) -> Self {
        Self { generation }
    }

    pub fn generation(self) -> u64 {
        self.generation
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.generation)
    }
}

/// Byte-transfer collaborator.
///
/// Every method must return promptly: the transfer runs elsewhere and
/// reports back through the sink. After `cancel`, the transport reports
/// `cancelled(resume_data)` (or a cancellation error) once the transfer has
/// actually stopped; a task that already finished may ignore the request.
pub trait Transport: Send + Sync {
    /// Begins a fresh transfer of `request`.
    fn start(&self, request: &DownloadRequest, sink: TransportSink);

    /// Continues a transfer from bytes previously reported via `cancelled`.
    fn resume_from(&self, resume_data: &[u8], sink: TransportSink);

    fn cancel(&self, task: TaskHandle);
}
