//! Where the coordinator looks for resume bytes when it (re)binds a task.
//!
//! The coordinator only reads. Callers fill the store, typically from
//! `DownloadEvent::CancelledWithResumeData`, and decide how long bytes live.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::record::DownloadId;

pub trait ResumeDataStore: Send + Sync {
    fn get(&self, id: &DownloadId) -> Option<Vec<u8>>;
}

/// In-memory store; the CLI preloads it from the job database.
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    blobs: RwLock<HashMap<DownloadId, Vec<u8>>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: DownloadId, resume_data: Vec<u8>) {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, resume_data);
    }

    pub fn remove(&self, id: &DownloadId) -> Option<Vec<u8>> {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResumeDataStore for MemoryResumeStore {
    fn get(&self, id: &DownloadId) -> Option<Vec<u8>> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}
