//! Failure classification and critical-step rules.
//!
//! Executors do not attach structured error codes, so a failure is classified
//! from its message text against an ordered keyword table. The first matching
//! rule wins; anything unmatched is fatal.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionPlan, Step};

/// Default base delay between step retries
pub const DEFAULT_STEP_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Substrings that mark a step as critical (case-insensitive)
pub const CRITICAL_MARKERS: &[&str] = &["init", "setup"];

/// Category a failure message falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureClass {
    Timeout,
    Network,
    Auth,
    Syntax,
    Unknown,
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::Timeout | FailureClass::Network)
    }

    /// Multiplier applied to the base delay when retrying
    pub fn delay_factor(&self) -> u32 {
        match self {
            FailureClass::Timeout => 2,
            FailureClass::Network => 1,
            FailureClass::Auth | FailureClass::Syntax | FailureClass::Unknown => 0,
        }
    }
}

/// One row of the keyword table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRule {
    /// Lowercase substrings; any one of them matches
    pub keywords: Vec<String>,
    pub class: FailureClass,
}

impl FailureRule {
    pub fn new(class: FailureClass, keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            class,
        }
    }

    fn matches(&self, message: &str) -> bool {
        self.keywords.iter().any(|k| message.contains(k.as_str()))
    }
}

/// Built-in keyword table, in match order.
pub fn default_rules() -> Vec<FailureRule> {
    vec![
        FailureRule::new(FailureClass::Timeout, &["timed out", "timeout"]),
        FailureRule::new(
            FailureClass::Network,
            &["network", "econnreset", "econnrefused", "connection reset", "connection refused"],
        ),
        FailureRule::new(
            FailureClass::Auth,
            &["unauthorized", "authentication", "forbidden", "permission denied"],
        ),
        FailureRule::new(FailureClass::Syntax, &["syntax error", "syntaxerror"]),
    ]
}

/// What to do after a step failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay: Duration,
    pub class: FailureClass,
}

#[derive(Debug, Clone)]
pub struct FailurePolicy {
    pub rules: Vec<FailureRule>,
    pub base_delay: Duration,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_RETRY_DELAY)
    }
}

impl FailurePolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            rules: default_rules(),
            base_delay,
        }
    }

    /// Prepend a rule so it takes precedence over the built-ins
    pub fn with_rule(mut self, rule: FailureRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn classify(&self, message: &str) -> FailureClass {
        let message = message.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.matches(&message))
            .map(|r| r.class)
            .unwrap_or(FailureClass::Unknown)
    }

    pub fn decide(&self, message: &str) -> RetryDecision {
        let class = self.classify(message);
        RetryDecision {
            should_retry: class.is_retryable(),
            delay: self.base_delay.saturating_mul(class.delay_factor()),
            class,
        }
    }
}

/// A step is critical when it is the plan's first step, or its id or
/// description mentions init/setup.
pub fn is_critical_step(step: &Step, plan: &ExecutionPlan) -> bool {
    if plan.steps.first().is_some_and(|first| first.id == step.id) {
        return true;
    }

    let id = step.id.to_lowercase();
    let description = step.description.to_lowercase();
    CRITICAL_MARKERS
        .iter()
        .any(|m| id.contains(m) || description.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FailurePolicy {
        FailurePolicy::new(Duration::from_millis(1000))
    }

    #[test]
    fn test_timeout_retries_with_double_delay() {
        let decision = policy().decide("Request timed out after 30s");
        assert!(decision.should_retry);
        assert_eq!(decision.delay, Duration::from_millis(2000));
        assert_eq!(decision.class, FailureClass::Timeout);
    }

    #[test]
    fn test_network_retries_with_base_delay() {
        let decision = policy().decide("Network error: ECONNRESET");
        assert!(decision.should_retry);
        assert_eq!(decision.delay, Duration::from_millis(1000));
        assert_eq!(decision.class, FailureClass::Network);
    }

    #[test]
    fn test_auth_and_syntax_are_fatal() {
        let unauthorized = policy().decide("Unauthorized access");
        assert!(!unauthorized.should_retry);
        assert_eq!(unauthorized.class, FailureClass::Auth);

        let syntax = policy().decide("Syntax error in generated code");
        assert!(!syntax.should_retry);
        assert_eq!(syntax.class, FailureClass::Syntax);
    }

    #[test]
    fn test_unknown_is_fatal() {
        let decision = policy().decide("something odd happened");
        assert!(!decision.should_retry);
        assert_eq!(decision.class, FailureClass::Unknown);
        assert_eq!(decision.delay, Duration::ZERO);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(policy().classify("TIMED OUT"), FailureClass::Timeout);
        assert_eq!(policy().classify("network unreachable"), FailureClass::Network);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Mentions both; timeout is checked first
        assert_eq!(policy().classify("network request timed out"), FailureClass::Timeout);
    }

    #[test]
    fn test_custom_rule_takes_precedence() {
        let policy = policy().with_rule(FailureRule::new(FailureClass::Network, &["rate limit"]));
        let decision = policy.decide("Rate limit exceeded");
        assert!(decision.should_retry);
        assert_eq!(decision.class, FailureClass::Network);
    }

    #[test]
    fn test_is_critical_step() {
        let plan = ExecutionPlan::new(
            "p",
            "t",
            vec![
                Step::new("step-1", "code-writer", "Write code"),
                Step::new("step-2", "devops", "Initialize project"),
                Step::new("env-setup", "devops", "Prepare"),
                Step::new("step-4", "reviewer", "Review"),
            ],
        );

        assert!(is_critical_step(&plan.steps[0], &plan));
        assert!(is_critical_step(&plan.steps[1], &plan));
        assert!(is_critical_step(&plan.steps[2], &plan));
        assert!(!is_critical_step(&plan.steps[3], &plan));
    }
}
