//! Lifecycle events and the bus that fans them out to subscribers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::queue::QueueEntry;
use crate::record::{DownloadId, DownloadStatus};
use crate::transport::TaskHandle;

/// Emitted at least once per transition; consumers should be idempotent.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// Membership changed; the full list in admission order.
    QueueChanged(Vec<QueueEntry>),
    /// A transport task was bound to the record.
    TaskCreated { id: DownloadId, task: TaskHandle },
    StatusChanged { id: DownloadId, status: DownloadStatus },
    DownloadFinished { id: DownloadId, destination: PathBuf },
    /// A cancellation took effect; persist the bytes to resume cheaply later.
    CancelledWithResumeData {
        id: DownloadId,
        resume_data: Option<Vec<u8>>,
    },
}

/// Unbounded fan-out: a slow subscriber never loses events. Subscribers
/// whose receiver is dropped are pruned on the next publish.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<DownloadEvent>>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DownloadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn publish(&self, event: DownloadEvent) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_every_event() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(DownloadEvent::QueueChanged(Vec::new()));
        assert_eq!(a.try_recv().unwrap(), DownloadEvent::QueueChanged(Vec::new()));
        assert_eq!(b.try_recv().unwrap(), DownloadEvent::QueueChanged(Vec::new()));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::default();
        drop(bus.subscribe());
        let mut live = bus.subscribe();
        bus.publish(DownloadEvent::QueueChanged(Vec::new()));
        assert_eq!(bus.subscribers.lock().unwrap().len(), 1);
        assert!(live.try_recv().is_ok());
    }
}
