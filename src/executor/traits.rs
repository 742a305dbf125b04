//! Executor contracts consumed by the lane queue and the plan orchestrator.
//!
//! Agent logic lives behind these traits. The core never builds prompts or
//! talks to an LLM itself.

use async_trait::async_trait;

use crate::domain::{RunResult, TaskRecord};

/// Failure raised by an executor.
///
/// The message text is the only thing the orchestrator classifies, so
/// implementations should keep upstream wording ("timed out", "Unauthorized")
/// intact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutorError {
    pub message: String,
}

impl ExecutorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ExecutorError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ExecutorError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<crate::error::LaneError> for ExecutorError {
    fn from(err: crate::error::LaneError) -> Self {
        Self::new(err.to_string())
    }
}

/// Runs one queued task.
///
/// Called concurrently for distinct tasks, and possibly more than once for the
/// same task when it is retried after a partial attempt.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &TaskRecord) -> Result<RunResult, ExecutorError>;
}

/// Single-task facade used by the orchestrator for each plan step.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, agent_type: &str, input: &str, session_id: &str) -> Result<RunResult, ExecutorError>;
}
