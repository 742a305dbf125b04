//! Textual reports for plan runs.

use crate::domain::{ExecutionResult, StepResult, StepStatus};

/// One line per step with a status glyph, then the totals.
pub fn aggregate_results(step_results: &[StepResult]) -> String {
    let mut lines: Vec<String> = step_results
        .iter()
        .map(|r| {
            let mut line = format!("{} {} [{}] {}", r.status.glyph(), r.step.id, r.step.agent_type, r.step.description);
            if r.status != StepStatus::Completed
                && let Some(error) = &r.error
            {
                line.push_str(&format!(" ({})", error));
            }
            line
        })
        .collect();

    let count = |status: StepStatus| step_results.iter().filter(|r| r.status == status).count();
    lines.push(format!(
        "Completed: {}, Failed: {}, Skipped: {}",
        count(StepStatus::Completed),
        count(StepStatus::Failed),
        count(StepStatus::Skipped)
    ));

    lines.join("\n")
}

/// Short report: plan id, outcome, step ratio and artifact paths.
pub fn summarize_execution(result: &ExecutionResult) -> String {
    let mut lines = vec![
        format!("Plan: {}", result.plan_id),
        format!("Success: {}", result.success),
        format!("Steps: {}/{} completed", result.completed_steps, result.total_steps),
        format!("Duration: {}ms", result.duration_ms),
    ];

    if result.artifacts.is_empty() {
        lines.push("Artifacts: none".to_string());
    } else {
        lines.push("Artifacts:".to_string());
        lines.extend(result.artifacts.iter().map(|a| format!("  - {}", a.path)));
    }

    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        lines.extend(result.errors.iter().map(|e| format!("  - {}", e)));
    }

    lines.join("\n")
}
