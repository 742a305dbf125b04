//! Events broadcast by the lane queue.
//!
//! Observers (CLI progress, logging, metrics layers) subscribe with
//! `LaneQueue::subscribe`. Sending never blocks the scheduler; slow receivers
//! see `Lagged` and skip ahead.

use std::time::Duration;

/// Lifecycle event for a task or lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// Task accepted into a lane
    Enqueued { task_id: String, lane: String },
    /// Task handed to the executor
    Started { task_id: String, lane: String, attempt: u32 },
    /// Executor returned a result
    Completed { task_id: String, lane: String },
    /// Attempt failed; task requeued after `delay`
    Retrying {
        task_id: String,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    /// Retries exhausted
    Failed { task_id: String, error: String },
    /// Cancelled while queued
    Cancelled { task_id: String },
    LanePaused { lane: String },
    LaneResumed { lane: String },
    /// Queued tasks dropped from a lane
    LaneCleared { lane: String, removed: usize },
}

impl QueueEvent {
    /// Task id the event refers to, if any
    pub fn task_id(&self) -> Option<&str> {
        match self {
            QueueEvent::Enqueued { task_id, .. }
            | QueueEvent::Started { task_id, .. }
            | QueueEvent::Completed { task_id, .. }
            | QueueEvent::Retrying { task_id, .. }
            | QueueEvent::Failed { task_id, .. }
            | QueueEvent::Cancelled { task_id } => Some(task_id),
            QueueEvent::LanePaused { .. } | QueueEvent::LaneResumed { .. } | QueueEvent::LaneCleared { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_accessor() {
        let event = QueueEvent::Started {
            task_id: "t1".to_string(),
            lane: "main".to_string(),
            attempt: 1,
        };
        assert_eq!(event.task_id(), Some("t1"));

        let event = QueueEvent::LaneCleared {
            lane: "main".to_string(),
            removed: 3,
        };
        assert_eq!(event.task_id(), None);
    }
}
