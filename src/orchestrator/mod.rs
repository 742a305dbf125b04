//! Plan Orchestrator: runs multi-step execution plans.
//!
//! - **Policy**: keyword table mapping failure text to retry decisions, plus
//!   the critical-step rule.
//! - **Parsing**: structured JSON plans or free text wrapped into one step.
//! - **Reports**: per-step glyph listing and a short run summary.
//! - **PlanOrchestrator**: walks the plan against an `AgentExecutor`.

mod parse;
mod policy;
mod report;
mod runner;

pub use parse::{DEFAULT_AGENT_TYPE, parse_plan_input, parse_plan_input_with};
pub use policy::{
    CRITICAL_MARKERS, DEFAULT_STEP_RETRY_DELAY, FailureClass, FailurePolicy, FailureRule, RetryDecision,
    default_rules, is_critical_step,
};
pub use report::{aggregate_results, summarize_execution};
pub use runner::{OrchestratorConfig, PlanOrchestrator};
