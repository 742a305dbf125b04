//! Candidate selection for a single lane.
//!
//! A task is a candidate when:
//! - Status is `queued`
//! - Any retry backoff has elapsed
//! - Every dependency id has a record with status `completed`
//!
//! Candidates are ordered by priority (descending) and then by enqueue order,
//! and truncated to the lane's free slots. Dependencies are resolved lazily on
//! every pass, so forward references and cross-lane dependencies just work.

use std::cmp::Reverse;
use std::collections::HashMap;

use tokio::time::Instant;

use crate::domain::{TaskRecord, TaskStatus};
use crate::queue::lane::Lane;
use crate::queue::state::TaskEntry;

/// True when every dependency has a completed record.
///
/// Unknown ids (not enqueued yet, or removed) count as unmet.
pub(crate) fn dependencies_met(record: &TaskRecord, tasks: &HashMap<String, TaskEntry>) -> bool {
    record.dependencies.iter().all(|dep| {
        tasks
            .get(dep)
            .map(|e| e.record.status == TaskStatus::Completed)
            .unwrap_or(false)
    })
}

/// Whether a task may be dispatched right now
pub(crate) fn is_eligible(entry: &TaskEntry, tasks: &HashMap<String, TaskEntry>, now: Instant) -> bool {
    if entry.record.status != TaskStatus::Queued {
        return false;
    }

    if let Some(retry_at) = entry.retry_at
        && retry_at > now
    {
        return false;
    }

    dependencies_met(&entry.record, tasks)
}

/// Pick the ids to dispatch from `lane` on this pass.
pub(crate) fn select_for_lane(lane: &Lane, tasks: &HashMap<String, TaskEntry>, now: Instant) -> Vec<String> {
    let available_slots = lane.available_slots();
    if available_slots == 0 {
        return vec![];
    }

    let mut candidates: Vec<&TaskEntry> = lane
        .queued
        .iter()
        .filter_map(|id| tasks.get(id))
        .filter(|e| is_eligible(e, tasks, now))
        .collect();

    // Higher priority first, then FIFO
    candidates.sort_by_key(|e| (Reverse(e.record.priority), e.seq));
    candidates.truncate(available_slots);

    candidates.into_iter().map(|e| e.record.id.clone()).collect()
}
