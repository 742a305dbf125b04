//! Queue-wide statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::TaskStatus;
use crate::queue::state::QueueState;

/// Snapshot of task counts across the queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_tasks: usize,
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Task count per lane (every configured lane appears, possibly with 0)
    pub by_lane: BTreeMap<String, usize>,
    pub lane_count: usize,
}

impl QueueStats {
    pub(crate) fn collect(state: &QueueState) -> Self {
        let mut stats = QueueStats {
            lane_count: state.lanes.len(),
            by_lane: state.lanes.iter().map(|l| (l.name().to_string(), 0)).collect(),
            ..Default::default()
        };

        for entry in state.tasks.values() {
            stats.total_tasks += 1;
            match entry.record.status {
                TaskStatus::Queued => stats.queued += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
            *stats.by_lane.entry(entry.record.lane.clone()).or_insert(0) += 1;
        }

        stats
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Queued => self.queued,
            TaskStatus::Running => self.running,
            TaskStatus::Completed => self.completed,
            TaskStatus::Failed => self.failed,
            TaskStatus::Cancelled => self.cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskRecord;
    use crate::queue::lane::default_lanes;
    use crate::queue::state::TaskEntry;

    #[test]
    fn test_collect_counts() {
        let mut state = QueueState::new(&default_lanes());
        let statuses = [
            ("a", "main", TaskStatus::Queued),
            ("b", "main", TaskStatus::Completed),
            ("c", "parallel", TaskStatus::Running),
            ("d", "parallel", TaskStatus::Failed),
        ];
        for (i, (id, lane, status)) in statuses.iter().enumerate() {
            let mut entry = TaskEntry::new(TaskRecord::new(id.to_string(), "agent", "in", lane, "s"), i as u64);
            entry.set_status(*status);
            state.tasks.insert(id.to_string(), entry);
        }

        let stats = QueueStats::collect(&state);
        assert_eq!(stats.total_tasks, 4);
        assert_eq!(stats.count(TaskStatus::Queued), 1);
        assert_eq!(stats.count(TaskStatus::Running), 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.cancelled, 0);
        assert_eq!(stats.by_lane.get("main"), Some(&2));
        assert_eq!(stats.by_lane.get("parallel"), Some(&2));
        assert_eq!(stats.by_lane.get("planner"), Some(&0));
        assert_eq!(stats.lane_count, 3);
    }
}
