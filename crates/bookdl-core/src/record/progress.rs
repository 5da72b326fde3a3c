//! Shared progress cell.
//!
//! Every clone of a `Progress` points at the same `watch` channel, so the
//! cell keeps its identity for the record's whole lifetime and observers
//! subscribe instead of polling.

use std::sync::Arc;
use tokio::sync::watch;

/// Fraction complete in `[0.0, 1.0]`, observable through `subscribe`.
#[derive(Debug, Clone)]
pub struct Progress {
    cell: Arc<watch::Sender<f64>>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(watch::Sender::new(0.0)),
        }
    }

    pub fn fraction(&self) -> f64 {
        *self.cell.borrow()
    }

    /// Receiver that is notified on every change of the fraction.
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.cell.subscribe()
    }

    /// True when both handles refer to the same cell.
    pub fn same_cell(&self, other: &Progress) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Applies a byte count. Unknown or zero `expected` leaves the fraction
    /// untouched so unknown-length transfers never regress.
    pub(crate) fn record_bytes(&self, written: u64, expected: Option<u64>) {
        let Some(expected) = expected.filter(|&e| e > 0) else {
            return;
        };
        self.set((written as f64 / expected as f64).clamp(0.0, 1.0));
    }

    pub(crate) fn complete(&self) {
        self.set(1.0);
    }

    fn set(&self, fraction: f64) {
        self.cell.send_if_modified(|current| {
            if *current == fraction {
                return false;
            }
            *current = fraction;
            true
        });
    }
}
