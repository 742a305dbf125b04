//! Per-step and per-plan outcome types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Artifact, RunResult, Step};

/// Outcome of one plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Failed,
    /// Not attempted: a dependency did not complete, or a critical step aborted the plan
    Skipped,
}

impl StepStatus {
    /// Glyph used in textual reports
    pub fn glyph(&self) -> &'static str {
        match self {
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "○",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step: Step,
    pub status: StepStatus,
    pub result: Option<RunResult>,
    /// Failure text, or the reason a step was skipped
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Executor attempts made for this step (0 when skipped)
    pub attempts: u32,
}

impl StepResult {
    pub fn completed(step: &Step, result: RunResult, started_at: DateTime<Utc>, attempts: u32) -> Self {
        Self {
            step: step.clone(),
            status: StepStatus::Completed,
            result: Some(result),
            error: None,
            started_at,
            ended_at: Utc::now(),
            attempts,
        }
    }

    pub fn failed(step: &Step, error: impl Into<String>, started_at: DateTime<Utc>, attempts: u32) -> Self {
        Self {
            step: step.clone(),
            status: StepStatus::Failed,
            result: None,
            error: Some(error.into()),
            started_at,
            ended_at: Utc::now(),
            attempts,
        }
    }

    pub fn skipped(step: &Step, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            step: step.clone(),
            status: StepStatus::Skipped,
            result: None,
            error: Some(reason.into()),
            started_at: now,
            ended_at: now,
            attempts: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// Aggregated report for one `execute_plan` call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub plan_id: String,
    pub task_id: String,
    /// True iff no step failed
    pub success: bool,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub step_results: Vec<StepResult>,
    /// Human-readable step listing
    pub output: String,
    /// Artifacts from completed steps, in step order
    pub artifacts: Vec<Artifact>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn count(&self, status: StepStatus) -> usize {
        self.step_results.iter().filter(|r| r.status == status).count()
    }

    pub fn statuses(&self) -> Vec<StepStatus> {
        self.step_results.iter().map(|r| r.status).collect()
    }
}
