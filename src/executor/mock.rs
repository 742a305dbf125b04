//! Scriptable executor for tests and local experiments.
//!
//! Every call succeeds with `ok: <input>` unless a script matches the call's
//! input or agent type. Scripts can fail a fixed number of times, fail forever,
//! panic, or attach artifacts. Calls are recorded along with peak concurrency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{Artifact, RunResult, TaskRecord};
use crate::executor::{AgentExecutor, ExecutorError, TaskExecutor};

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub agent_type: String,
    pub input: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Default)]
struct Script {
    /// Remaining failures; `None` fails forever once `error` is set
    failures_left: Option<u32>,
    error: Option<String>,
    panic: bool,
    artifacts: Vec<Artifact>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    scripts: HashMap<String, Script>,
    calls: Vec<MockCall>,
}

/// Executor whose behavior is driven by per-key scripts
#[derive(Debug, Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to every call (holds the lane slot, like a real LLM call)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `times` calls matching `key`, then succeed
    pub fn fail_times(self, key: &str, times: u32, error: &str) -> Self {
        self.script(key, |s| {
            s.failures_left = Some(times);
            s.error = Some(error.to_string());
        })
    }

    /// Fail every call matching `key`
    pub fn always_fail(self, key: &str, error: &str) -> Self {
        self.script(key, |s| {
            s.failures_left = None;
            s.error = Some(error.to_string());
        })
    }

    /// Panic inside the executor for calls matching `key`
    pub fn panic_on(self, key: &str) -> Self {
        self.script(key, |s| s.panic = true)
    }

    /// Attach an artifact to successful calls matching `key`
    pub fn with_artifact(self, key: &str, artifact: Artifact) -> Self {
        self.script(key, |s| s.artifacts.push(artifact))
    }

    /// Per-key delay, overriding the global one
    pub fn with_key_delay(self, key: &str, delay: Duration) -> Self {
        self.script(key, |s| s.delay = Some(delay))
    }

    fn script(self, key: &str, f: impl FnOnce(&mut Script)) -> Self {
        {
            let mut state = self.state();
            f(state.scripts.entry(key.to_string()).or_default());
        }
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Calls whose input equals `input`
    pub fn calls_for(&self, input: &str) -> usize {
        self.state().calls.iter().filter(|c| c.input == input).count()
    }

    /// Highest number of calls observed in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Record the call and decide its outcome while holding the lock once
    fn plan_call(&self, agent_type: &str, input: &str, session_id: &str) -> (Option<String>, bool, Vec<Artifact>, Duration) {
        let mut state = self.state();
        state.calls.push(MockCall {
            agent_type: agent_type.to_string(),
            input: input.to_string(),
            session_id: session_id.to_string(),
        });

        let key = if state.scripts.contains_key(input) {
            Some(input)
        } else if state.scripts.contains_key(agent_type) {
            Some(agent_type)
        } else {
            None
        };

        let Some(script) = key.and_then(|k| state.scripts.get_mut(k)) else {
            return (None, false, vec![], self.delay);
        };

        let delay = script.delay.unwrap_or(self.delay);
        let error = match (script.error.clone(), script.failures_left) {
            (Some(err), None) => Some(err),
            (Some(err), Some(n)) if n > 0 => {
                script.failures_left = Some(n - 1);
                Some(err)
            }
            _ => None,
        };

        (error, script.panic, script.artifacts.clone(), delay)
    }

    async fn run(&self, agent_type: &str, input: &str, session_id: &str) -> Result<RunResult, ExecutorError> {
        let started_at = Utc::now();
        let (error, panic, artifacts, delay) = self.plan_call(agent_type, input, session_id);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        let in_flight = InFlight(&self.in_flight);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        drop(in_flight);

        if panic {
            panic!("mock executor panic for {}", input);
        }
        if let Some(err) = error {
            return Err(ExecutorError::new(err));
        }

        let mut result = RunResult::success(session_id, agent_type, format!("ok: {}", input));
        result.artifacts = artifacts;
        Ok(result.timed(started_at, Utc::now()))
    }
}

/// Releases one in-flight slot, even when the call is dropped mid-sleep
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn execute(&self, task: &TaskRecord) -> Result<RunResult, ExecutorError> {
        self.run(&task.agent_type, &task.input, &task.session_id).await
    }
}

#[async_trait]
impl AgentExecutor for MockExecutor {
    async fn execute(&self, agent_type: &str, input: &str, session_id: &str) -> Result<RunResult, ExecutorError> {
        self.run(agent_type, input, session_id).await
    }
}
