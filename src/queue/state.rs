//! Shared mutable queue state.
//!
//! Everything here lives behind the queue's single mutex. Status transitions,
//! retry bookkeeping and dependency checks all happen while it is held, so no
//! task record is ever mutated from two places at once.

use std::collections::HashMap;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::domain::{TaskRecord, TaskStatus};
use crate::queue::lane::{Lane, LaneConfig};

/// A task record plus the bookkeeping the scheduler needs.
#[derive(Debug)]
pub(crate) struct TaskEntry {
    pub record: TaskRecord,
    /// Enqueue order, used as the FIFO tie-break
    pub seq: u64,
    /// Not eligible before this instant (set while waiting out a retry backoff)
    pub retry_at: Option<Instant>,
    /// Completion signal for `wait_for`
    pub status_tx: watch::Sender<TaskStatus>,
}

impl TaskEntry {
    pub fn new(record: TaskRecord, seq: u64) -> Self {
        let (status_tx, _) = watch::channel(record.status);
        Self {
            record,
            seq,
            retry_at: None,
            status_tx,
        }
    }

    /// Update the record's status and publish it to waiters
    pub fn set_status(&mut self, status: TaskStatus) {
        self.record.status = status;
        self.status_tx.send_replace(status);
    }
}

#[derive(Debug)]
pub(crate) struct QueueState {
    pub tasks: HashMap<String, TaskEntry>,
    /// In configuration order
    pub lanes: Vec<Lane>,
    pub next_seq: u64,
}

impl QueueState {
    pub fn new(lanes: &[LaneConfig]) -> Self {
        Self {
            tasks: HashMap::new(),
            lanes: lanes.iter().cloned().map(Lane::new).collect(),
            next_seq: 0,
        }
    }

    pub fn lane(&self, name: &str) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.name() == name)
    }

    pub fn lane_mut(&mut self, name: &str) -> Option<&mut Lane> {
        self.lanes.iter_mut().find(|l| l.name() == name)
    }

    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Earliest pending retry deadline, if any task is waiting out a backoff
    pub fn next_retry_at(&self) -> Option<Instant> {
        self.tasks
            .values()
            .filter(|e| e.record.status == TaskStatus::Queued)
            .filter_map(|e| e.retry_at)
            .min()
    }
}
