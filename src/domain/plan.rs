//! Execution plan types
//!
//! An `ExecutionPlan` is the declarative multi-step workflow the orchestrator
//! walks. Steps only exist inside their plan; dependencies are step ids.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{LaneError, Result};

/// Complexity tier assigned during analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    #[default]
    Simple,
    Medium,
    Complex,
}

/// How the analysis suggests the plan be run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// Requirement analysis attached to a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analysis {
    pub user_requirement: String,
    pub complexity: Complexity,
    /// Estimated duration in seconds
    pub estimated_duration: u64,
    pub required_capabilities: Vec<String>,
    pub suggested_mode: ExecutionMode,
}

/// One node of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub agent_type: String,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, agent_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_type: agent_type.into(),
            description: description.into(),
            dependencies: vec![],
        }
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.push(step_id.into());
        self
    }
}

/// Ordered, dependency-annotated set of steps plus descriptive metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub plan_id: String,
    pub task_id: String,
    #[serde(default)]
    pub analysis: Analysis,
    pub steps: Vec<Step>,
    /// Seconds
    #[serde(default)]
    pub total_estimated_duration: u64,
    #[serde(default)]
    pub risks: Vec<String>,
}

impl ExecutionPlan {
    pub fn new(plan_id: impl Into<String>, task_id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            plan_id: plan_id.into(),
            task_id: task_id.into(),
            analysis: Analysis::default(),
            steps,
            total_estimated_duration: 0,
            risks: vec![],
        }
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Check plan invariants: non-empty ids, unique step ids, and dependencies
    /// that name steps of this plan (other than the step itself).
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(LaneError::InvalidPlan("step with empty id".to_string()));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(LaneError::InvalidPlan(format!("duplicate step id: {}", step.id)));
            }
        }

        for step in &self.steps {
            for dep in &step.dependencies {
                if dep == &step.id {
                    return Err(LaneError::InvalidPlan(format!("step {} depends on itself", step.id)));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(LaneError::InvalidPlan(format!(
                        "step {} depends on unknown step {}",
                        step.id, dep
                    )));
                }
            }
        }

        Ok(())
    }
}
