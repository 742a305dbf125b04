//! Plan input parsing.
//!
//! Structured input is a JSON object with a `plan` field holding an
//! `ExecutionPlan`. Anything else is treated as a free-text requirement and
//! wrapped into a one-step plan.

use serde_json::Value;

use crate::domain::{Analysis, ExecutionPlan, Step};
use crate::error::{LaneError, Result};
use crate::id::{generate_plan_id, generate_task_id};

/// Agent type used for synthesized single-step plans
pub const DEFAULT_AGENT_TYPE: &str = "code-writer";

pub fn parse_plan_input(input: &str) -> Result<ExecutionPlan> {
    parse_plan_input_with(input, DEFAULT_AGENT_TYPE)
}

/// Like `parse_plan_input`, with the agent type for free-text plans supplied.
pub fn parse_plan_input_with(input: &str, default_agent_type: &str) -> Result<ExecutionPlan> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LaneError::InvalidPlan("empty plan input".to_string()));
    }

    if let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(trimmed)
        && let Some(plan) = object.remove("plan")
    {
        let plan: ExecutionPlan =
            serde_json::from_value(plan).map_err(|e| LaneError::InvalidPlan(format!("malformed plan: {}", e)))?;
        plan.validate()?;
        tracing::debug!(plan_id = %plan.plan_id, steps = plan.steps.len(), "Parsed structured plan");
        return Ok(plan);
    }

    Ok(text_plan(input, default_agent_type))
}

fn text_plan(input: &str, agent_type: &str) -> ExecutionPlan {
    let analysis = Analysis {
        user_requirement: input.to_string(),
        ..Default::default()
    };

    ExecutionPlan::new(
        generate_plan_id(),
        generate_task_id(),
        vec![Step::new("step-1", agent_type, input)],
    )
    .with_analysis(analysis)
}
