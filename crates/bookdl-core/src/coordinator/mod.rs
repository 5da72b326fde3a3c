//! Download coordinator: the public face of the lifecycle.
//!
//! `DownloadCoordinator` is a cheap, cloneable handle to a single tokio task
//! that owns the queue and every record's status. Each operation is sent to
//! that task and acknowledged once its effects (admissions, transport calls,
//! events) have been applied.

mod actor;
mod error;
mod events;

pub use error::CoordinatorError;
pub use events::DownloadEvent;

pub(crate) use actor::Message;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::config::BookdlConfig;
use crate::destination::{DestinationResolver, FileSystem, LocalFileSystem};
use crate::record::{DownloadId, DownloadRecord};
use crate::resume_store::ResumeDataStore;
use crate::transport::Transport;
use actor::{Actor, Command};
use events::EventBus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Where finished files are moved to.
    pub downloads_dir: PathBuf,
    /// Maximum simultaneously downloading records. Zero holds everything.
    pub capacity: usize,
}

impl CoordinatorConfig {
    pub fn new(downloads_dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            capacity,
        }
    }

    /// Downloads directory and concurrency limit from the user config.
    pub fn from_config(cfg: &BookdlConfig) -> anyhow::Result<Self> {
        Ok(Self::new(cfg.downloads_dir()?, cfg.max_concurrent_downloads))
    }
}

/// Collaborators injected into the coordinator.
#[derive(Clone)]
pub struct CoordinatorDeps {
    pub transport: Arc<dyn Transport>,
    pub fs: Arc<dyn FileSystem>,
    pub resume_store: Option<Arc<dyn ResumeDataStore>>,
}

impl CoordinatorDeps {
    /// Real filesystem, no resume store.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            fs: Arc::new(LocalFileSystem),
            resume_store: None,
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_resume_store(mut self, store: Arc<dyn ResumeDataStore>) -> Self {
        self.resume_store = Some(store);
        self
    }
}

#[derive(Debug, Clone)]
pub struct DownloadCoordinator {
    inbox: mpsc::UnboundedSender<Message>,
    events: EventBus,
}

impl DownloadCoordinator {
    /// Spawns the coordinator task on the current tokio runtime.
    pub fn spawn(config: CoordinatorConfig, deps: CoordinatorDeps) -> Self {
        let (inbox, rx) = mpsc::unbounded_channel();
        let events = EventBus::default();
        let actor = Actor::new(
            config.capacity,
            config.downloads_dir,
            deps.transport,
            DestinationResolver::new(deps.fs),
            deps.resume_store,
            events.clone(),
            inbox.downgrade(),
        );
        tokio::spawn(actor.run(rx));
        Self { inbox, events }
    }

    /// Every event published from now on. Events are never dropped for a
    /// live receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DownloadEvent> {
        self.events.subscribe()
    }

    /// Queues `record`; it starts right away if a slot is free. Stored
    /// resume data for its id, if any, is used instead of the request.
    pub async fn append(&self, record: DownloadRecord) -> Result<(), CoordinatorError> {
        self.call(|reply| Command::Append { record, reply }).await?
    }

    /// Moves the record to paused and cancels its task. The cancellation
    /// arrives later as `DownloadEvent::CancelledWithResumeData`. No-op for
    /// finished records.
    pub async fn pause(&self, id: &DownloadId) -> Result<(), CoordinatorError> {
        let id = id.clone();
        self.call(|reply| Command::Pause { id, reply }).await?
    }

    /// Moves a paused or failed record back to idle with a fresh task; it
    /// starts when admitted. No-op for finished or downloading records.
    pub async fn resume(&self, id: &DownloadId) -> Result<(), CoordinatorError> {
        let id = id.clone();
        self.call(|reply| Command::Resume { id, reply }).await?
    }

    /// Cancels the record's task and drops it from the queue.
    pub async fn remove(&self, id: &DownloadId) -> Result<DownloadRecord, CoordinatorError> {
        let id = id.clone();
        self.call(|reply| Command::Remove { id, reply }).await?
    }

    /// Raising the limit admits idle records; lowering it never interrupts
    /// running ones.
    pub async fn set_capacity(&self, capacity: usize) -> Result<(), CoordinatorError> {
        self.call(|reply| Command::SetCapacity { capacity, reply })
            .await
    }

    pub async fn capacity(&self) -> Result<usize, CoordinatorError> {
        self.call(|reply| Command::Capacity { reply }).await
    }

    /// Snapshot of one record. Its progress cell stays live.
    pub async fn lookup(&self, id: &DownloadId) -> Result<Option<DownloadRecord>, CoordinatorError> {
        let id = id.clone();
        self.call(|reply| Command::Lookup { id, reply }).await
    }

    /// Every record, in admission order.
    pub async fn records(&self) -> Result<Vec<DownloadRecord>, CoordinatorError> {
        self.call(|reply| Command::Records { reply }).await
    }

    /// Cancels running tasks and stops the coordinator. Later calls on any
    /// handle fail with `CoordinatorError::Shutdown`.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.call(|reply| Command::Shutdown { reply }).await
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(Message::Command(command(tx)))
            .map_err(|_| CoordinatorError::Shutdown)?;
        rx.await.map_err(|_| CoordinatorError::Shutdown)
    }
}
