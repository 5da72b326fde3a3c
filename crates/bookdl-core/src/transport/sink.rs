//! Callback path from transports back to the coordinator.

use std::path::PathBuf;
use tokio::sync::mpsc;

use super::{TaskHandle, TransportError};
use crate::coordinator::Message;

/// Asynchronous callback from a transport task.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Progress {
        bytes_written: u64,
        bytes_expected: Option<u64>,
    },
    /// The transfer ended and the body sits at `temp_path`.
    Completed {
        temp_path: PathBuf,
        status: u16,
        suggested_name: Option<String>,
    },
    Failed(TransportError),
    /// Confirmation that a cancel request took effect.
    Cancelled { resume_data: Option<Vec<u8>> },
}

#[derive(Debug, Clone)]
enum Route {
    Coordinator(mpsc::UnboundedSender<Message>),
    Detached(mpsc::UnboundedSender<(TaskHandle, TransportEvent)>),
}

/// Sender bound to one task. Cheap to clone into transfer threads.
/// Sends after the receiving side is gone are dropped silently.
#[derive(Debug, Clone)]
pub struct TransportSink {
    task: TaskHandle,
    route: Route,
}

impl TransportSink {
    pub(crate) fn new(task: TaskHandle, inbox: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            task,
            route: Route::Coordinator(inbox),
        }
    }

    /// Sink that is not attached to a coordinator; events land on the
    /// returned receiver. For driving a transport on its own.
    pub fn detached(task: TaskHandle) -> (Self, mpsc::UnboundedReceiver<(TaskHandle, TransportEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                task,
                route: Route::Detached(tx),
            },
            rx,
        )
    }

    pub fn task(&self) -> TaskHandle {
        self.task
    }

    pub fn progress(&self, bytes_written: u64, bytes_expected: Option<u64>) {
        self.send(TransportEvent::Progress {
            bytes_written,
            bytes_expected,
        });
    }

    pub fn completed(&self, temp_path: PathBuf, status: u16, suggested_name: Option<String>) {
        self.send(TransportEvent::Completed {
            temp_path,
            status,
            suggested_name,
        });
    }

    pub fn failed(&self, error: TransportError) {
        self.send(TransportEvent::Failed(error));
    }

    pub fn cancelled(&self, resume_data: Option<Vec<u8>>) {
        self.send(TransportEvent::Cancelled { resume_data });
    }

    pub fn send(&self, event: TransportEvent) {
        let delivered = match &self.route {
            Route::Coordinator(tx) => tx
                .send(Message::Transport {
                    task: self.task,
                    event,
                })
                .is_ok(),
            Route::Detached(tx) => tx.send((self.task, event)).is_ok(),
        };
        if !delivered {
            tracing::trace!(task = %self.task, "transport event dropped: receiver gone");
        }
    }
}
