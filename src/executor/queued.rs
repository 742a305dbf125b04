//! AgentExecutor backed by the Lane Queue.
//!
//! Each call becomes one queue task in the configured lane, enqueued with no
//! queue-level retries, and the call waits for that task to settle. Retry
//! policy stays with the orchestrator.
//!
//! A call never leaves a duplicate behind. A task still queued when the wait
//! gives up (or when the call is dropped) is cancelled. A task already running
//! is awaited, and if the call was dropped the next call for the same step
//! picks that task up instead of enqueueing another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::LaneError;
use crate::domain::{RunResult, TaskOptions, TaskStatus};
use crate::executor::{AgentExecutor, ExecutorError};
use crate::queue::{LANE_MAIN, LaneQueue};

/// How long a single dispatched step may sit in the queue before the wait gives up
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Session, agent type and input of one step call
type StepKey = (String, String, String);

#[derive(Debug, Clone)]
pub struct QueueAgentExecutor {
    queue: LaneQueue,
    lane: String,
    priority: Option<i32>,
    wait_timeout: Option<Duration>,
    /// Tasks left running by a dropped call, keyed by step
    abandoned: Arc<Mutex<HashMap<StepKey, String>>>,
}

impl QueueAgentExecutor {
    pub fn new(queue: LaneQueue) -> Self {
        Self {
            queue,
            lane: LANE_MAIN.to_string(),
            priority: None,
            wait_timeout: Some(DEFAULT_WAIT_TIMEOUT),
            abandoned: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = lane.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = Some(wait_timeout);
        self
    }

    /// Wait for each task however long it takes
    pub fn without_wait_timeout(mut self) -> Self {
        self.wait_timeout = None;
        self
    }

    pub fn queue(&self) -> &LaneQueue {
        &self.queue
    }

    pub fn lane(&self) -> &str {
        &self.lane
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }

    fn abandoned(&self) -> MutexGuard<'_, HashMap<StepKey, String>> {
        self.abandoned.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Task id left behind by an earlier dropped call for this step, if the queue still knows it
    fn take_abandoned(&self, key: &StepKey) -> Option<String> {
        let task_id = self.abandoned().remove(key)?;
        self.queue.get_task(&task_id).map(|_| task_id)
    }

    fn dispatch(&self, agent_type: &str, input: &str, session_id: &str) -> Result<String, ExecutorError> {
        let mut options = TaskOptions::new().with_max_retries(0);
        if let Some(priority) = self.priority {
            options = options.with_priority(priority);
        }

        let task_id = self.queue.enqueue(agent_type, input, &self.lane, session_id, options)?;
        tracing::debug!(task_id = %task_id, lane = %self.lane, agent_type = %agent_type, "Step dispatched to lane queue");
        Ok(task_id)
    }
}

/// Settles the dispatched task if the call ends before the task does
struct Dispatched<'a> {
    executor: &'a QueueAgentExecutor,
    task_id: String,
    key: StepKey,
    settled: bool,
}

impl Drop for Dispatched<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let queue = &self.executor.queue;
        if queue.cancel(&self.task_id) {
            tracing::debug!(task_id = %self.task_id, "Dropped step call cancelled its queued task");
        } else if queue.get_task(&self.task_id).is_some() {
            tracing::debug!(task_id = %self.task_id, "Dropped step call left its task running; next call resumes it");
            self.executor.abandoned().insert(self.key.clone(), self.task_id.clone());
        }
    }
}

#[async_trait]
impl AgentExecutor for QueueAgentExecutor {
    async fn execute(&self, agent_type: &str, input: &str, session_id: &str) -> Result<RunResult, ExecutorError> {
        let key = (session_id.to_string(), agent_type.to_string(), input.to_string());
        let task_id = match self.take_abandoned(&key) {
            Some(task_id) => {
                tracing::debug!(task_id = %task_id, "Resuming step task from a dropped call");
                task_id
            }
            None => self.dispatch(agent_type, input, session_id)?,
        };

        let mut dispatched = Dispatched {
            executor: self,
            task_id: task_id.clone(),
            key,
            settled: false,
        };

        let wait_timeout = self.wait_timeout.unwrap_or(Duration::MAX);
        let record = match self.queue.wait_for(&task_id, wait_timeout).await {
            Ok(record) => record,
            Err(err @ LaneError::WaitTimeout { .. }) if self.queue.cancel(&task_id) => {
                dispatched.settled = true;
                tracing::debug!(task_id = %task_id, "Wait timed out; queued step task cancelled");
                return Err(err.into());
            }
            Err(LaneError::WaitTimeout { .. }) => {
                tracing::debug!(task_id = %task_id, "Wait timed out with the step task running; waiting for it to finish");
                self.queue.wait_for(&task_id, Duration::MAX).await?
            }
            Err(err) => return Err(err.into()),
        };
        dispatched.settled = true;

        match (record.status, record.result) {
            (TaskStatus::Completed, Some(result)) => Ok(result),
            (TaskStatus::Completed, None) => Err(ExecutorError::new(format!("task {} completed without a result", task_id))),
            (TaskStatus::Cancelled, _) => Err(ExecutorError::new(format!("task {} was cancelled", task_id))),
            (_, _) => Err(ExecutorError::new(
                record.error.unwrap_or_else(|| format!("task {} failed", task_id)),
            )),
        }
    }
}
