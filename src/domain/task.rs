//! Task record and related types
//!
//! A task is one schedulable unit of executor work. The lane queue owns every
//! record for its whole lifetime; callers only ever see clones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::RunResult;

/// Default priority for tasks enqueued without one (mid-range of 0..=10).
pub const DEFAULT_PRIORITY: i32 = 5;

/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Status of a task's execution
///
/// Transitions: `queued -> running -> {completed | failed}`, with a bounded
/// `running -> queued` retry cycle. Only a queued task can become `cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for dependencies, a free slot, or a retry backoff
    Queued,
    /// Handed to the executor
    Running,
    /// Executor returned a result
    Completed,
    /// Retries exhausted
    Failed,
    /// Cancelled by the caller before dispatch
    Cancelled,
}

impl TaskStatus {
    /// Returns true if the task will never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional knobs for `LaneQueue::enqueue`
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Explicit task id; generated when absent
    pub id: Option<String>,
    /// Higher dispatches first
    pub priority: Option<i32>,
    pub max_retries: Option<u32>,
    /// Ids that must reach `completed` first; forward references are allowed
    pub dependencies: Vec<String>,
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn depends_on(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }
}

/// Read view of a task held by the lane queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    //=== Identity ===
    pub id: String,
    /// Tag interpreted by the executor (e.g. "planner", "code-writer")
    pub agent_type: String,
    /// Opaque payload handed to the executor
    pub input: String,
    pub lane: String,
    pub session_id: String,

    //=== Scheduling ===
    pub priority: i32,
    pub dependencies: Vec<String>,
    pub max_retries: u32,
    pub retry_count: u32,
    pub status: TaskStatus,

    //=== Timestamps ===
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    //=== Outcome ===
    pub result: Option<RunResult>,
    pub error: Option<String>,
}

impl TaskRecord {
    /// Create a queued record with default priority and retry budget
    pub fn new(id: String, agent_type: &str, input: &str, lane: &str, session_id: &str) -> Self {
        Self {
            id,
            agent_type: agent_type.to_string(),
            input: input.to_string(),
            lane: lane.to_string(),
            session_id: session_id.to_string(),
            priority: DEFAULT_PRIORITY,
            dependencies: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_count: 0,
            status: TaskStatus::Queued,
            enqueued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Apply caller options, falling back to the given defaults
    pub fn with_options(mut self, options: &TaskOptions, default_priority: i32, default_max_retries: u32) -> Self {
        self.priority = options.priority.unwrap_or(default_priority);
        self.max_retries = options.max_retries.unwrap_or(default_max_retries);
        self.dependencies = options.dependencies.clone();
        self
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// True when another attempt is allowed after a failure
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(options: &TaskOptions) -> TaskRecord {
        TaskRecord::new("task-1".to_string(), "code-writer", "write it", "main", "session-1").with_options(
            options,
            DEFAULT_PRIORITY,
            DEFAULT_MAX_RETRIES,
        )
    }

    #[test]
    fn test_new_record_uses_defaults() {
        let task = record(&TaskOptions::new());
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert_eq!(task.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(task.retry_count, 0);
        assert!(task.started_at.is_none());
        assert!(!task.is_finished());
    }

    #[test]
    fn test_new_record_applies_options() {
        let options = TaskOptions::new()
            .with_priority(9)
            .with_max_retries(0)
            .depends_on("task-0");
        let task = record(&options);
        assert_eq!(task.priority, 9);
        assert_eq!(task.max_retries, 0);
        assert_eq!(task.dependencies, vec!["task-0".to_string()]);
        assert!(!task.can_retry());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        assert_eq!(TaskStatus::Running.to_string(), "running");
    }
}
