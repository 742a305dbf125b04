//! Domain types for laneq
//!
//! This module contains the data model shared by the lane queue and the
//! plan orchestrator:
//! - TaskRecord: one schedulable unit of executor work and its lifecycle
//! - RunResult / Artifact: what an executor hands back
//! - ExecutionPlan / Step: declarative multi-step workflows
//! - StepResult / ExecutionResult: per-step and per-plan outcomes

pub mod plan;
pub mod run_result;
pub mod step_result;
pub mod task;

pub use plan::{Analysis, Complexity, ExecutionMode, ExecutionPlan, Step};
pub use run_result::{Artifact, RunResult};
pub use step_result::{ExecutionResult, StepResult, StepStatus};
pub use task::{DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY, TaskOptions, TaskRecord, TaskStatus};
