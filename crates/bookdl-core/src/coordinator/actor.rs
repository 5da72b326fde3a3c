//! The coordinator task: sole owner of the queue, the task bindings and
//! every record's status.
//!
//! Commands and transport callbacks arrive on one FIFO inbox and are handled
//! to completion one at a time, so a callback queued behind a `pause` sees
//! the paused record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::error::CoordinatorError;
use super::events::{DownloadEvent, EventBus};
use crate::destination::{destination_name, DestinationResolver};
use crate::queue::{DownloadQueue, QueueSignal};
use crate::record::{DownloadId, DownloadRecord, DownloadRequest, DownloadStatus, FailureKind};
use crate::resume_store::ResumeDataStore;
use crate::transport::{
    classify_http_status, TaskHandle, Transport, TransportError, TransportEvent, TransportSink,
};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, CoordinatorError>>;

#[derive(Debug)]
pub(crate) enum Message {
    Command(Command),
    Transport {
        task: TaskHandle,
        event: TransportEvent,
    },
}

#[derive(Debug)]
pub(crate) enum Command {
    Append {
        record: DownloadRecord,
        reply: Reply<()>,
    },
    Pause {
        id: DownloadId,
        reply: Reply<()>,
    },
    Resume {
        id: DownloadId,
        reply: Reply<()>,
    },
    Remove {
        id: DownloadId,
        reply: Reply<DownloadRecord>,
    },
    SetCapacity {
        capacity: usize,
        reply: oneshot::Sender<()>,
    },
    Capacity {
        reply: oneshot::Sender<usize>,
    },
    Lookup {
        id: DownloadId,
        reply: oneshot::Sender<Option<DownloadRecord>>,
    },
    Records {
        reply: oneshot::Sender<Vec<DownloadRecord>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// What a bound-but-not-started task will be launched from.
#[derive(Debug)]
enum TaskSource {
    Request(DownloadRequest),
    ResumeData(Vec<u8>),
}

#[derive(Debug)]
struct Binding {
    handle: TaskHandle,
    /// `Some` until the transport has been told to start.
    pending: Option<TaskSource>,
}

pub(crate) struct Actor {
    queue: DownloadQueue,
    /// Current task per record.
    tasks: HashMap<DownloadId, Binding>,
    /// Every handle that may still call back, including superseded ones
    /// whose cancellation has not been confirmed yet.
    owners: HashMap<TaskHandle, DownloadId>,
    next_generation: u64,
    transport: Arc<dyn Transport>,
    resolver: DestinationResolver,
    resume_store: Option<Arc<dyn ResumeDataStore>>,
    downloads_dir: PathBuf,
    events: EventBus,
    inbox: mpsc::WeakUnboundedSender<Message>,
}

impl Actor {
    pub fn new(
        capacity: usize,
        downloads_dir: PathBuf,
        transport: Arc<dyn Transport>,
        resolver: DestinationResolver,
        resume_store: Option<Arc<dyn ResumeDataStore>>,
        events: EventBus,
        inbox: mpsc::WeakUnboundedSender<Message>,
    ) -> Self {
        Self {
            queue: DownloadQueue::new(capacity),
            tasks: HashMap::new(),
            owners: HashMap::new(),
            next_generation: 0,
            transport,
            resolver,
            resume_store,
            downloads_dir,
            events,
            inbox,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        tracing::debug!(capacity = self.queue.capacity(), "download coordinator started");
        while let Some(message) = rx.recv().await {
            match message {
                Message::Command(Command::Shutdown { reply }) => {
                    self.cancel_all();
                    let _ = reply.send(());
                    tracing::debug!("download coordinator shut down");
                    return;
                }
                Message::Command(command) => self.handle_command(command),
                Message::Transport { task, event } => self.handle_transport(task, event),
            }
        }
        // Every handle and sink is gone.
        self.cancel_all();
        tracing::debug!("download coordinator stopped");
    }

    fn handle_command(&mut self, command: Command) {
        // A caller that stopped waiting for its reply is not an error.
        match command {
            Command::Append { record, reply } => {
                let _ = reply.send(self.append(record));
            }
            Command::Pause { id, reply } => {
                let _ = reply.send(self.pause(&id));
            }
            Command::Resume { id, reply } => {
                let _ = reply.send(self.resume(&id));
            }
            Command::Remove { id, reply } => {
                let _ = reply.send(self.remove(&id));
            }
            Command::SetCapacity { capacity, reply } => {
                tracing::debug!(capacity, "set capacity");
                let signals = self.queue.set_capacity(capacity);
                self.apply(signals);
                let _ = reply.send(());
            }
            Command::Capacity { reply } => {
                let _ = reply.send(self.queue.capacity());
            }
            Command::Lookup { id, reply } => {
                let _ = reply.send(self.queue.get(&id).cloned());
            }
            Command::Records { reply } => {
                let _ = reply.send(self.queue.records().cloned().collect());
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn append(&mut self, record: DownloadRecord) -> Result<(), CoordinatorError> {
        let id = record.id().clone();
        if self.queue.get(&id).is_some() {
            return Err(CoordinatorError::DuplicateId(id));
        }
        tracing::info!(id = %id, url = %record.request().url, "download queued");
        let source = self.source_for(&id, record.request());
        self.bind(&id, source);
        let signals = self
            .queue
            .append(record)
            .map_err(|_| CoordinatorError::DuplicateId(id))?;
        self.apply(signals);
        Ok(())
    }

    fn pause(&mut self, id: &DownloadId) -> Result<(), CoordinatorError> {
        let status = self.status_of(id)?;
        if status.is_finished() {
            tracing::debug!(id = %id, "pause ignored: already finished");
            return Ok(());
        }
        tracing::info!(id = %id, "download paused");
        self.set_status(id, DownloadStatus::Paused);
        self.cancel_binding(id, false);
        let signals = self.queue.update();
        self.apply(signals);
        Ok(())
    }

    fn resume(&mut self, id: &DownloadId) -> Result<(), CoordinatorError> {
        let status = self.status_of(id)?;
        if status.is_finished() || status == DownloadStatus::Downloading {
            tracing::debug!(id = %id, status = %status, "resume ignored");
            return Ok(());
        }
        tracing::info!(id = %id, "download resumed");
        let request = self.queue.get(id).map(|r| r.request().clone());
        if let Some(request) = request {
            let source = self.source_for(id, &request);
            self.bind(id, source);
        }
        self.set_status(id, DownloadStatus::Idle);
        let signals = self.queue.update();
        self.apply(signals);
        Ok(())
    }

    fn remove(&mut self, id: &DownloadId) -> Result<DownloadRecord, CoordinatorError> {
        if self.queue.get(id).is_none() {
            return Err(CoordinatorError::NotFound(id.clone()));
        }
        tracing::info!(id = %id, "download removed");
        self.cancel_binding(id, true);
        let (record, signals) = self
            .queue
            .remove(id)
            .ok_or_else(|| CoordinatorError::NotFound(id.clone()))?;
        self.apply(signals);
        Ok(record)
    }

    fn status_of(&self, id: &DownloadId) -> Result<DownloadStatus, CoordinatorError> {
        self.queue
            .get(id)
            .map(|record| record.status().clone())
            .ok_or_else(|| CoordinatorError::NotFound(id.clone()))
    }

    /// Stored resume bytes win over a fresh request.
    fn source_for(&self, id: &DownloadId, request: &DownloadRequest) -> TaskSource {
        match self.resume_store.as_ref().and_then(|store| store.get(id)) {
            Some(bytes) => {
                tracing::debug!(id = %id, len = bytes.len(), "using stored resume data");
                TaskSource::ResumeData(bytes)
            }
            None => TaskSource::Request(request.clone()),
        }
    }

    /// Mints a new generation and makes it the record's current task.
    fn bind(&mut self, id: &DownloadId, source: TaskSource) -> TaskHandle {
        self.next_generation += 1;
        let handle = TaskHandle::new(self.next_generation);
        let previous = self.tasks.insert(
            id.clone(),
            Binding {
                handle,
                pending: Some(source),
            },
        );
        // A superseded task that never started cannot call back.
        if let Some(old) = previous.filter(|b| b.pending.is_some()) {
            self.owners.remove(&old.handle);
        }
        self.owners.insert(handle, id.clone());
        tracing::debug!(id = %id, task = %handle, "task bound");
        self.events.publish(DownloadEvent::TaskCreated {
            id: id.clone(),
            task: handle,
        });
        handle
    }

    /// Stops the record's current task. A task that never started is
    /// dropped on the spot and its cancellation reported immediately; a
    /// running one is asked to stop and reports back through its sink.
    /// `forget` unbinds a running task as well (the record is going away).
    fn cancel_binding(&mut self, id: &DownloadId, forget: bool) {
        let Some(binding) = self.tasks.get(id) else {
            return;
        };
        let handle = binding.handle;
        if binding.pending.is_some() {
            let pending = self.tasks.remove(id).and_then(|b| b.pending);
            self.owners.remove(&handle);
            let resume_data = match pending {
                Some(TaskSource::ResumeData(bytes)) => Some(bytes),
                _ => None,
            };
            self.events.publish(DownloadEvent::CancelledWithResumeData {
                id: id.clone(),
                resume_data,
            });
            return;
        }
        tracing::debug!(id = %id, task = %handle, "cancelling task");
        if forget {
            self.tasks.remove(id);
        }
        self.transport.cancel(handle);
    }

    fn cancel_all(&mut self) {
        for binding in self.tasks.values().filter(|b| b.pending.is_none()) {
            self.transport.cancel(binding.handle);
        }
    }

    fn apply(&mut self, signals: Vec<QueueSignal>) {
        for signal in signals {
            match signal {
                QueueSignal::Admit(id) => self.start(&id),
                QueueSignal::MembershipChanged => {
                    self.events
                        .publish(DownloadEvent::QueueChanged(self.queue.snapshot()));
                }
            }
        }
    }

    /// `idle → downloading`: hands the pending source to the transport.
    fn start(&mut self, id: &DownloadId) {
        let Some(record) = self.queue.get(id) else {
            return;
        };
        if *record.status() != DownloadStatus::Idle {
            return;
        }
        let request = record.request().clone();
        let needs_binding = self
            .tasks
            .get(id)
            .map_or(true, |binding| binding.pending.is_none());
        if needs_binding {
            let source = self.source_for(id, &request);
            self.bind(id, source);
        }
        let Some(inbox) = self.inbox.upgrade() else {
            tracing::debug!(id = %id, "not starting: coordinator is shutting down");
            return;
        };
        let Some(binding) = self.tasks.get_mut(id) else {
            return;
        };
        let handle = binding.handle;
        let source = binding
            .pending
            .take()
            .unwrap_or(TaskSource::Request(request));
        let sink = TransportSink::new(handle, inbox);

        tracing::info!(id = %id, task = %handle, "download started");
        self.set_status(id, DownloadStatus::Downloading);
        match &source {
            TaskSource::Request(request) => self.transport.start(request, sink),
            TaskSource::ResumeData(bytes) => self.transport.resume_from(bytes, sink),
        }
    }

    fn set_status(&mut self, id: &DownloadId, status: DownloadStatus) {
        let Some(record) = self.queue.get_mut(id) else {
            return;
        };
        if *record.status() == status {
            return;
        }
        record.set_status(status.clone());
        self.events.publish(DownloadEvent::StatusChanged {
            id: id.clone(),
            status,
        });
    }

    fn handle_transport(&mut self, task: TaskHandle, event: TransportEvent) {
        let Some(id) = self.owners.get(&task).cloned() else {
            tracing::trace!(task = %task, "event from unknown task dropped");
            return;
        };

        let event = match event {
            TransportEvent::Failed(err) if err.is_cancelled() => {
                TransportEvent::Cancelled { resume_data: None }
            }
            other => other,
        };
        if let TransportEvent::Cancelled { resume_data } = event {
            self.on_cancelled(task, &id, resume_data);
            return;
        }

        if !self.is_current(task, &id) {
            self.on_stale(task, &id, event);
            return;
        }

        match event {
            TransportEvent::Progress {
                bytes_written,
                bytes_expected,
            } => {
                if let Some(record) = self.queue.get(&id) {
                    record.progress().record_bytes(bytes_written, bytes_expected);
                }
            }
            TransportEvent::Completed {
                temp_path,
                status,
                suggested_name,
            } => {
                self.release(task, &id);
                self.on_completed(&id, &temp_path, status, suggested_name.as_deref());
                let signals = self.queue.update();
                self.apply(signals);
            }
            TransportEvent::Failed(err) => {
                self.release(task, &id);
                self.on_failed(&id, err);
                let signals = self.queue.update();
                self.apply(signals);
            }
            TransportEvent::Cancelled { .. } => {}
        }
    }

    /// A task the coordinator already stopped caring about. A terminal event
    /// from it ends the pending cancellation: the body is thrown away and the
    /// cancellation reported without resume data.
    fn on_stale(&mut self, task: TaskHandle, id: &DownloadId, event: TransportEvent) {
        match event {
            TransportEvent::Completed { temp_path, .. } => {
                if let Err(e) = self.resolver.discard(&temp_path) {
                    tracing::warn!(
                        id = %id,
                        path = %temp_path.display(),
                        "could not delete abandoned download: {}",
                        e
                    );
                }
            }
            TransportEvent::Failed(_) => {}
            _ => {
                tracing::trace!(id = %id, task = %task, "stale transport event dropped");
                return;
            }
        }
        tracing::debug!(id = %id, task = %task, "task ended before its cancellation");
        self.release(task, id);
        self.events.publish(DownloadEvent::CancelledWithResumeData {
            id: id.clone(),
            resume_data: None,
        });
    }

    /// Current means: the record's bound task, already started, and the
    /// record is still downloading.
    fn is_current(&self, task: TaskHandle, id: &DownloadId) -> bool {
        let bound = self
            .tasks
            .get(id)
            .is_some_and(|b| b.handle == task && b.pending.is_none());
        let downloading = self
            .queue
            .get(id)
            .is_some_and(|r| *r.status() == DownloadStatus::Downloading);
        bound && downloading
    }

    /// The task will not call back again.
    fn release(&mut self, task: TaskHandle, id: &DownloadId) {
        self.owners.remove(&task);
        if self.tasks.get(id).is_some_and(|b| b.handle == task) {
            self.tasks.remove(id);
        }
    }

    fn on_cancelled(&mut self, task: TaskHandle, id: &DownloadId, resume_data: Option<Vec<u8>>) {
        let was_current = self.is_current(task, id);
        self.release(task, id);
        tracing::debug!(
            id = %id,
            task = %task,
            resumable = resume_data.is_some(),
            "cancellation confirmed"
        );
        self.events.publish(DownloadEvent::CancelledWithResumeData {
            id: id.clone(),
            resume_data,
        });
        if was_current {
            // Nobody asked: the transport gave up on its own.
            tracing::info!(id = %id, "download cancelled by transport");
            self.set_status(id, DownloadStatus::Paused);
            let signals = self.queue.update();
            self.apply(signals);
        }
    }

    fn on_completed(
        &mut self,
        id: &DownloadId,
        temp_path: &Path,
        status: u16,
        suggested_name: Option<&str>,
    ) {
        let Some(record) = self.queue.get(id) else {
            return;
        };
        let name = destination_name(suggested_name, &record.request().url, id);
        let landed = self
            .resolver
            .resolve(&name, &self.downloads_dir)
            .and_then(|dest| self.resolver.move_file(temp_path, &dest).map(|()| dest));

        let destination = match landed {
            Ok(dest) => dest,
            Err(e) => {
                tracing::warn!(id = %id, "could not move download into place: {}", e);
                let failure = FailureKind::Io {
                    description: e.to_string(),
                };
                self.set_status(id, DownloadStatus::Failed(failure));
                return;
            }
        };

        if let Some(failure) = classify_http_status(status) {
            tracing::warn!(
                id = %id,
                status,
                destination = %destination.display(),
                "download finished with server error"
            );
            self.set_status(id, DownloadStatus::Failed(failure));
            return;
        }

        if let Some(record) = self.queue.get(id) {
            record.progress().complete();
        }
        tracing::info!(id = %id, destination = %destination.display(), "download finished");
        self.set_status(id, DownloadStatus::Finished);
        self.events.publish(DownloadEvent::DownloadFinished {
            id: id.clone(),
            destination,
        });
    }

    fn on_failed(&mut self, id: &DownloadId, err: TransportError) {
        tracing::warn!(id = %id, "download failed: {}", err);
        if let Some(failure) = err.into_failure() {
            self.set_status(id, DownloadStatus::Failed(failure));
        }
    }
}
