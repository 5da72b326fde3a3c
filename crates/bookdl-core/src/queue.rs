//! Admission-control queue.
//!
//! Pure synchronous state machine: owns the records in insertion order and
//! decides which idle records may start under the capacity limit. It never
//! changes a record's status itself; it returns `QueueSignal`s and the owner
//! (the coordinator) applies them. No I/O, no locking.

use std::collections::HashMap;

use crate::record::{DownloadId, DownloadRecord, DownloadStatus};

/// Intent emitted by a queue mutation, applied by the owner in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSignal {
    /// The record may transition `idle → downloading`.
    Admit(DownloadId),
    /// Membership changed; observers should be sent a fresh snapshot.
    MembershipChanged,
}

/// Row of a queue snapshot, in list order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: DownloadId,
    pub status: DownloadStatus,
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("download {0} is already queued")]
    DuplicateId(DownloadId),
}

/// Ordered list plus id lookup; both always hold the same ids.
#[derive(Debug)]
pub struct DownloadQueue {
    order: Vec<DownloadId>,
    records: HashMap<DownloadId, DownloadRecord>,
    capacity: usize,
}

impl DownloadQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: Vec::new(),
            records: HashMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Adds the record at the back of the list, then runs an admission pass.
    pub fn append(&mut self, record: DownloadRecord) -> Result<Vec<QueueSignal>, QueueError> {
        let id = record.id().clone();
        if self.records.contains_key(&id) {
            return Err(QueueError::DuplicateId(id));
        }
        self.order.push(id.clone());
        self.records.insert(id, record);

        let mut signals = self.update();
        signals.push(QueueSignal::MembershipChanged);
        Ok(signals)
    }

    /// Deletes the record from both structures, then runs an admission pass.
    /// Returns `None` (and no signals) when the id is unknown.
    pub fn remove(&mut self, id: &DownloadId) -> Option<(DownloadRecord, Vec<QueueSignal>)> {
        let record = self.records.remove(id)?;
        self.order.retain(|queued| queued != id);

        let mut signals = self.update();
        signals.push(QueueSignal::MembershipChanged);
        Some((record, signals))
    }

    /// Stores the new limit and runs an admission pass. Membership is
    /// unchanged, so no `MembershipChanged` is emitted.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<QueueSignal> {
        self.capacity = capacity;
        self.update()
    }

    /// Admission pass: emits `Admit` for up to `capacity - downloading` idle
    /// records in list order. When more records are downloading than the
    /// capacity allows (capacity shrank), nothing is admitted and nothing is
    /// demoted; admitted work runs to completion or cancellation.
    pub fn update(&self) -> Vec<QueueSignal> {
        let downloading = self.downloading_count();
        if downloading > self.capacity {
            return Vec::new();
        }
        let slots = self.capacity - downloading;
        self.records()
            .filter(|record| *record.status() == DownloadStatus::Idle)
            .take(slots)
            .map(|record| QueueSignal::Admit(record.id().clone()))
            .collect()
    }

    pub fn get(&self, id: &DownloadId) -> Option<&DownloadRecord> {
        self.records.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &DownloadId) -> Option<&mut DownloadRecord> {
        self.records.get_mut(id)
    }

    /// Records in list (admission) order.
    pub fn records(&self) -> impl Iterator<Item = &DownloadRecord> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn downloading_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| *record.status() == DownloadStatus::Downloading)
            .count()
    }

    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.records()
            .map(|record| QueueEntry {
                id: record.id().clone(),
                status: record.status().clone(),
                fraction: record.progress().fraction(),
            })
            .collect()
    }

    /// Drops every record. The queue itself lives on.
    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DownloadRequest;

    fn record(id: &str) -> DownloadRecord {
        DownloadRecord::with_id(id, DownloadRequest::get(format!("https://example.com/{id}")))
    }

    /// Stands in for the coordinator: marks admitted records as downloading.
    fn apply(queue: &mut DownloadQueue, signals: Vec<QueueSignal>) {
        for signal in signals {
            if let QueueSignal::Admit(id) = signal {
                queue
                    .get_mut(&id)
                    .unwrap()
                    .set_status(DownloadStatus::Downloading);
            }
        }
    }

    fn status(queue: &DownloadQueue, id: &str) -> DownloadStatus {
        queue.get(&DownloadId::from(id)).unwrap().status().clone()
    }

    #[test]
    fn fifo_admission_with_capacity_one() {
        let mut q = DownloadQueue::new(1);
        for id in ["a", "b", "c"] {
            let signals = q.append(record(id)).unwrap();
            apply(&mut q, signals);
        }
        assert_eq!(status(&q, "a"), DownloadStatus::Downloading);
        assert_eq!(status(&q, "b"), DownloadStatus::Idle);
        assert_eq!(status(&q, "c"), DownloadStatus::Idle);
    }

    #[test]
    fn append_emits_admit_before_membership_change() {
        let mut q = DownloadQueue::new(2);
        let signals = q.append(record("a")).unwrap();
        assert_eq!(
            signals,
            vec![
                QueueSignal::Admit(DownloadId::from("a")),
                QueueSignal::MembershipChanged
            ]
        );
    }

    #[test]
    fn removing_active_admits_next_idle() {
        let mut q = DownloadQueue::new(1);
        for id in ["a", "b"] {
            let signals = q.append(record(id)).unwrap();
            apply(&mut q, signals);
        }
        let (removed, signals) = q.remove(&DownloadId::from("a")).unwrap();
        assert_eq!(removed.id().as_str(), "a");
        assert_eq!(signals[0], QueueSignal::Admit(DownloadId::from("b")));
        apply(&mut q, signals);
        assert_eq!(status(&q, "b"), DownloadStatus::Downloading);
    }

    #[test]
    fn raising_capacity_admits_exactly_the_new_slots() {
        let mut q = DownloadQueue::new(1);
        for id in ["a", "b", "c"] {
            let signals = q.append(record(id)).unwrap();
            apply(&mut q, signals);
        }
        let signals = q.set_capacity(2);
        assert_eq!(signals, vec![QueueSignal::Admit(DownloadId::from("b"))]);
        apply(&mut q, signals);
        assert_eq!(status(&q, "b"), DownloadStatus::Downloading);
        assert_eq!(status(&q, "c"), DownloadStatus::Idle);
    }

    #[test]
    fn shrinking_capacity_never_demotes() {
        let mut q = DownloadQueue::new(3);
        for id in ["a", "b", "c", "d"] {
            let signals = q.append(record(id)).unwrap();
            apply(&mut q, signals);
        }
        assert!(q.set_capacity(1).is_empty());
        assert_eq!(q.downloading_count(), 3);
        assert_eq!(status(&q, "d"), DownloadStatus::Idle);
    }

    #[test]
    fn zero_capacity_admits_nothing() {
        let mut q = DownloadQueue::new(0);
        let signals = q.append(record("a")).unwrap();
        assert_eq!(signals, vec![QueueSignal::MembershipChanged]);
    }

    #[test]
    fn duplicate_id_rejected_without_change() {
        let mut q = DownloadQueue::new(1);
        q.append(record("a")).unwrap();
        let err = q.append(record("a")).unwrap_err();
        assert_eq!(err, QueueError::DuplicateId(DownloadId::from("a")));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn remove_unknown_is_none() {
        let mut q = DownloadQueue::new(1);
        assert!(q.remove(&DownloadId::from("ghost")).is_none());
    }

    #[test]
    fn paused_and_finished_records_are_not_admitted() {
        let mut q = DownloadQueue::new(0);
        for id in ["a", "b", "c"] {
            q.append(record(id)).unwrap();
        }
        q.get_mut(&DownloadId::from("a"))
            .unwrap()
            .set_status(DownloadStatus::Paused);
        q.get_mut(&DownloadId::from("b"))
            .unwrap()
            .set_status(DownloadStatus::Finished);
        assert_eq!(
            q.set_capacity(5),
            vec![QueueSignal::Admit(DownloadId::from("c"))]
        );
    }

    #[test]
    fn capacity_bound_holds_over_mixed_operations() {
        let mut q = DownloadQueue::new(1);
        let mut next = 0;
        for step in 0..60 {
            let signals = match step % 5 {
                0..=2 => {
                    next += 1;
                    q.append(record(&format!("r{next}"))).unwrap()
                }
                3 => {
                    let first = q.records().next().map(|r| r.id().clone());
                    match first {
                        Some(id) => q.remove(&id).unwrap().1,
                        None => Vec::new(),
                    }
                }
                _ => q.set_capacity(q.capacity() + step % 2),
            };
            apply(&mut q, signals);
            assert!(q.downloading_count() <= q.capacity());
            assert_eq!(q.records().count(), q.len());
        }
    }

    #[test]
    fn snapshot_follows_list_order() {
        let mut q = DownloadQueue::new(0);
        for id in ["x", "y", "z"] {
            q.append(record(id)).unwrap();
        }
        q.remove(&DownloadId::from("y"));
        let ids: Vec<_> = q.snapshot().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![DownloadId::from("x"), DownloadId::from("z")]);
        q.clear();
        assert!(q.is_empty());
    }
}
