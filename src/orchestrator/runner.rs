//! PlanOrchestrator: walks an ExecutionPlan step by step.
//!
//! Steps run in declared order. For each step:
//! 1. Skip it if any dependency has no completed result
//! 2. Dispatch the description to the AgentExecutor
//! 3. On failure, classify the message and retry while the policy allows
//! 4. If a critical step ends failed, skip everything after it and stop
//!
//! Step-level failures never escape `execute_plan`; they end up in the
//! returned `ExecutionResult`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::domain::{ExecutionPlan, ExecutionResult, RunResult, Step, StepResult, StepStatus};
use crate::error::Result;
use crate::executor::AgentExecutor;
use crate::orchestrator::parse::{DEFAULT_AGENT_TYPE, parse_plan_input_with};
use crate::orchestrator::policy::{DEFAULT_STEP_RETRY_DELAY, FailurePolicy, RetryDecision, is_critical_step};
use crate::orchestrator::report::aggregate_results;

/// Configuration for the PlanOrchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Base delay fed to the failure policy
    pub retry_base_delay: Duration,
    /// Retries per step after the first attempt
    pub max_step_retries: u32,
    /// Agent type for plans synthesized from free text
    pub default_agent_type: String,
    /// Fail a step whose executor call runs longer than this
    pub step_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry_base_delay: DEFAULT_STEP_RETRY_DELAY,
            max_step_retries: 2,
            default_agent_type: DEFAULT_AGENT_TYPE.to_string(),
            step_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_max_step_retries(mut self, retries: u32) -> Self {
        self.max_step_retries = retries;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }
}

pub struct PlanOrchestrator {
    executor: Arc<dyn AgentExecutor>,
    policy: FailurePolicy,
    config: OrchestratorConfig,
}

impl PlanOrchestrator {
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        Self::with_config(executor, OrchestratorConfig::default())
    }

    pub fn with_config(executor: Arc<dyn AgentExecutor>, config: OrchestratorConfig) -> Self {
        Self {
            executor,
            policy: FailurePolicy::new(config.retry_base_delay),
            config,
        }
    }

    /// Replace the failure policy (keeps its own base delay)
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Classify a step failure.
    pub fn handle_failure(&self, step: &Step, error: &str) -> RetryDecision {
        let decision = self.policy.decide(error);
        tracing::debug!(
            step_id = %step.id,
            class = ?decision.class,
            should_retry = decision.should_retry,
            delay_ms = decision.delay.as_millis() as u64,
            "Classified step failure"
        );
        decision
    }

    /// Parse `input` (structured or free text) and run the resulting plan.
    pub async fn execute_input(&self, input: &str, session_id: &str) -> Result<ExecutionResult> {
        let plan = parse_plan_input_with(input, &self.config.default_agent_type)?;
        Ok(self.execute_plan(&plan, session_id).await)
    }

    pub async fn execute_plan(&self, plan: &ExecutionPlan, session_id: &str) -> ExecutionResult {
        let start = Instant::now();
        tracing::info!(
            plan_id = %plan.plan_id,
            task_id = %plan.task_id,
            steps = plan.steps.len(),
            session_id = %session_id,
            "Executing plan"
        );

        let mut results: Vec<StepResult> = Vec::with_capacity(plan.steps.len());
        let mut status_by_id: HashMap<&str, StepStatus> = HashMap::new();

        for (index, step) in plan.steps.iter().enumerate() {
            if let Some(dep) = step
                .dependencies
                .iter()
                .find(|d| status_by_id.get(d.as_str()) != Some(&StepStatus::Completed))
            {
                tracing::info!(step_id = %step.id, dependency = %dep, "Skipping step with incomplete dependency");
                status_by_id.insert(&step.id, StepStatus::Skipped);
                results.push(StepResult::skipped(step, format!("dependency {} did not complete", dep)));
                continue;
            }

            let result = self.run_step(step, session_id).await;
            status_by_id.insert(&step.id, result.status);
            let failed = result.status == StepStatus::Failed;
            results.push(result);

            if failed && is_critical_step(step, plan) {
                tracing::warn!(
                    plan_id = %plan.plan_id,
                    step_id = %step.id,
                    "Critical step failed, aborting remaining steps"
                );
                let reason = format!("aborted: critical step {} failed", step.id);
                results.extend(plan.steps[index + 1..].iter().map(|s| StepResult::skipped(s, reason.clone())));
                break;
            }
        }

        let result = build_result(plan, results, start.elapsed());
        tracing::info!(
            plan_id = %plan.plan_id,
            success = result.success,
            completed = result.completed_steps,
            total = result.total_steps,
            duration_ms = result.duration_ms,
            "Plan finished"
        );
        result
    }

    /// Run one step to completion, retrying per the failure policy.
    async fn run_step(&self, step: &Step, session_id: &str) -> StepResult {
        let started_at = Utc::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            tracing::debug!(step_id = %step.id, agent_type = %step.agent_type, attempt = attempts, "Running step");

            let error = match self.attempt(step, session_id).await {
                Ok(result) => {
                    tracing::info!(step_id = %step.id, attempts = attempts, "Step completed");
                    return StepResult::completed(step, result, started_at, attempts);
                }
                Err(error) => error,
            };

            let decision = self.handle_failure(step, &error);
            if decision.should_retry && attempts <= self.config.max_step_retries {
                tracing::warn!(
                    step_id = %step.id,
                    attempt = attempts,
                    delay_ms = decision.delay.as_millis() as u64,
                    error = %error,
                    "Step failed, retrying"
                );
                tokio::time::sleep(decision.delay).await;
                continue;
            }

            tracing::error!(step_id = %step.id, attempts = attempts, class = ?decision.class, error = %error, "Step failed");
            return StepResult::failed(step, error, started_at, attempts);
        }
    }

    /// One executor call; unsuccessful results and timeouts become error text
    async fn attempt(&self, step: &Step, session_id: &str) -> std::result::Result<RunResult, String> {
        let call = self.executor.execute(&step.agent_type, &step.description, session_id);

        let outcome = match self.config.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(format!("Step {} timed out after {}ms", step.id, limit.as_millis())),
            },
            None => call.await,
        };

        match outcome {
            Ok(result) if result.success => Ok(result),
            Ok(result) => Err(result
                .error
                .unwrap_or_else(|| format!("agent {} reported an unsuccessful run", step.agent_type))),
            Err(err) => Err(err.message),
        }
    }
}

fn build_result(plan: &ExecutionPlan, step_results: Vec<StepResult>, elapsed: Duration) -> ExecutionResult {
    let completed_steps = step_results.iter().filter(|r| r.is_completed()).count();
    let success = !step_results.iter().any(|r| r.status == StepStatus::Failed);

    let artifacts = step_results
        .iter()
        .filter(|r| r.is_completed())
        .filter_map(|r| r.result.as_ref())
        .flat_map(|r| r.artifacts.iter().cloned())
        .collect();

    let errors = step_results
        .iter()
        .filter(|r| r.status == StepStatus::Failed)
        .map(|r| format!("{}: {}", r.step.id, r.error.as_deref().unwrap_or("unknown error")))
        .collect();

    ExecutionResult {
        plan_id: plan.plan_id.clone(),
        task_id: plan.task_id.clone(),
        success,
        completed_steps,
        total_steps: plan.steps.len(),
        output: aggregate_results(&step_results),
        step_results,
        artifacts,
        errors,
        duration_ms: elapsed.as_millis() as u64,
    }
}
