//! Error types for laneq
//!
//! Centralized error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

/// All error types that can occur in the lane queue and plan orchestrator
#[derive(Debug, Error)]
pub enum LaneError {
    /// Enqueue named a lane that was never configured
    #[error("Lane not found: {0}")]
    LaneNotFound(String),

    /// Caller supplied a task id that is already registered
    #[error("Duplicate task id: {0}")]
    DuplicateTaskId(String),

    /// A wait elapsed before the task reached a terminal status
    #[error("Timed out after {timeout:?} waiting for task {task_id}")]
    WaitTimeout { task_id: String, timeout: Duration },

    /// Task id is unknown (never enqueued, or removed by a lane clear)
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Plan input could not be parsed or violates plan invariants
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Configuration is inconsistent
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for laneq operations
pub type Result<T> = std::result::Result<T, LaneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_not_found_error() {
        let err = LaneError::LaneNotFound("gpu".to_string());
        assert_eq!(err.to_string(), "Lane not found: gpu");
    }

    #[test]
    fn test_duplicate_task_id_error() {
        let err = LaneError::DuplicateTaskId("task-1".to_string());
        assert_eq!(err.to_string(), "Duplicate task id: task-1");
    }

    #[test]
    fn test_wait_timeout_error() {
        let err = LaneError::WaitTimeout {
            task_id: "task-1".to_string(),
            timeout: Duration::from_millis(50),
        };
        assert_eq!(err.to_string(), "Timed out after 50ms waiting for task task-1");
    }

    #[test]
    fn test_invalid_plan_error() {
        let err = LaneError::InvalidPlan("duplicate step id: step-1".to_string());
        assert_eq!(err.to_string(), "Invalid plan: duplicate step id: step-1");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: LaneError = json_err.into();
        assert!(matches!(err, LaneError::Json(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LaneError = io_err.into();
        assert!(matches!(err, LaneError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
