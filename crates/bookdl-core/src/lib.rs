pub mod config;
pub mod logging;

// Download lifecycle: records flow through the queue, the coordinator binds
// them to transport tasks and lands finished files via the resolver.
pub mod coordinator;
pub mod destination;
pub mod queue;
pub mod record;
pub mod resume_db;
pub mod resume_store;
pub mod transport;

pub use coordinator::{
    CoordinatorConfig, CoordinatorDeps, CoordinatorError, DownloadCoordinator, DownloadEvent,
};
pub use record::{DownloadId, DownloadRecord, DownloadRequest, DownloadStatus, FailureKind, Progress};
