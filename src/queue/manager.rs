//! LaneQueue: task admission, per-lane dispatch and completion handling.
//!
//! The queue runs one scheduling loop that, on every pass:
//! 1. Selects eligible tasks per lane (priority, FIFO, dependencies, free slots)
//! 2. Marks them running and spawns an executor call for each
//! 3. Sleeps until woken (enqueue, completion, resume) or the next tick
//!
//! Executor calls run concurrently in their own tokio tasks. Their outcome is
//! applied under the same lock the scheduler uses, and a failing or panicking
//! executor only ever affects its own task.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{Notify, broadcast, watch};
use tokio::time::Instant;

use crate::domain::{
    DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY, RunResult, TaskOptions, TaskRecord, TaskStatus,
};
use crate::error::{LaneError, Result};
use crate::executor::{ExecutorError, TaskExecutor};
use crate::id::generate_task_id;
use crate::queue::backoff::RetryBackoff;
use crate::queue::events::QueueEvent;
use crate::queue::lane::{LaneConfig, LaneStatus, default_lanes};
use crate::queue::select::select_for_lane;
use crate::queue::state::{QueueState, TaskEntry};
use crate::queue::stats::QueueStats;

/// Configuration for the LaneQueue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Lanes created at startup
    pub lanes: Vec<LaneConfig>,
    /// Priority for tasks enqueued without one
    pub default_priority: i32,
    /// Retry budget for tasks enqueued without one
    pub default_max_retries: u32,
    /// Delay schedule for requeued tasks
    pub backoff: RetryBackoff,
    /// Upper bound between scheduling passes when nothing wakes the loop
    pub tick_interval: Duration,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lanes: default_lanes(),
            default_priority: DEFAULT_PRIORITY,
            default_max_retries: DEFAULT_MAX_RETRIES,
            backoff: RetryBackoff::default(),
            tick_interval: Duration::from_millis(50),
            event_capacity: 256,
        }
    }
}

impl QueueConfig {
    /// Replace the lane set.
    pub fn with_lanes(mut self, lanes: Vec<LaneConfig>) -> Self {
        self.lanes = lanes;
        self
    }

    /// Add a lane (or replace one with the same name).
    pub fn with_lane(mut self, lane: LaneConfig) -> Self {
        self.lanes.retain(|l| l.name != lane.name);
        self.lanes.push(lane);
        self
    }

    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Reject empty or duplicate lane names and zero concurrency limits.
    pub fn validate(&self) -> Result<()> {
        if self.lanes.is_empty() {
            return Err(LaneError::Config("at least one lane is required".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for lane in &self.lanes {
            if lane.name.trim().is_empty() {
                return Err(LaneError::Config("lane name must not be empty".to_string()));
            }
            if lane.max_concurrent == 0 {
                return Err(LaneError::Config(format!("lane {} has max_concurrent 0", lane.name)));
            }
            if !seen.insert(lane.name.as_str()) {
                return Err(LaneError::Config(format!("duplicate lane: {}", lane.name)));
            }
        }

        if self.tick_interval.is_zero() {
            return Err(LaneError::Config("tick_interval must be positive".to_string()));
        }

        Ok(())
    }
}

struct Inner {
    state: Mutex<QueueState>,
    executor: Arc<dyn TaskExecutor>,
    config: QueueConfig,
    wake: Notify,
    events: broadcast::Sender<QueueEvent>,
    shutdown: watch::Sender<bool>,
}

/// Lane-scoped, priority-ordered, dependency-aware task queue.
///
/// Cheap to clone; all clones share one scheduler. The scheduler loop stops on
/// `shutdown()` or once every handle has been dropped.
#[derive(Clone)]
pub struct LaneQueue {
    inner: Arc<Inner>,
}

impl LaneQueue {
    /// Create a queue and start its scheduling loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(executor: Arc<dyn TaskExecutor>, config: QueueConfig) -> Result<Self> {
        config.validate()?;

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let tick = config.tick_interval;

        let inner = Arc::new(Inner {
            state: Mutex::new(QueueState::new(&config.lanes)),
            executor,
            config,
            wake: Notify::new(),
            events,
            shutdown,
        });

        tokio::spawn(run_scheduler(Arc::downgrade(&inner), shutdown_rx, tick));

        tracing::info!(
            lanes = inner.config.lanes.len(),
            tick_ms = tick.as_millis() as u64,
            "Lane queue started"
        );

        Ok(Self { inner })
    }

    /// Queue with the default `planner` / `main` / `parallel` lanes.
    pub fn with_default_lanes(executor: Arc<dyn TaskExecutor>) -> Result<Self> {
        Self::new(executor, QueueConfig::default())
    }

    /// Admit a task into `lane`. Returns the task id.
    ///
    /// Fails with `LaneNotFound` for an unknown lane and `DuplicateTaskId` for a
    /// caller-supplied id that is already registered; neither creates a record.
    pub fn enqueue(
        &self,
        agent_type: &str,
        input: &str,
        lane: &str,
        session_id: &str,
        options: TaskOptions,
    ) -> Result<String> {
        let task_id = {
            let mut state = self.inner.state();

            if state.lane(lane).is_none() {
                return Err(LaneError::LaneNotFound(lane.to_string()));
            }

            let task_id = options.id.clone().unwrap_or_else(generate_task_id);
            if state.tasks.contains_key(&task_id) {
                return Err(LaneError::DuplicateTaskId(task_id));
            }

            let record = TaskRecord::new(task_id.clone(), agent_type, input, lane, session_id).with_options(
                &options,
                self.inner.config.default_priority,
                self.inner.config.default_max_retries,
            );

            tracing::debug!(
                task_id = %task_id,
                lane = %lane,
                agent_type = %agent_type,
                priority = record.priority,
                dependencies = ?record.dependencies,
                "Task enqueued"
            );

            let seq = state.next_seq();
            state.tasks.insert(task_id.clone(), TaskEntry::new(record, seq));
            if let Some(l) = state.lane_mut(lane) {
                l.queued.push(task_id.clone());
            }
            task_id
        };

        self.inner.emit(QueueEvent::Enqueued {
            task_id: task_id.clone(),
            lane: lane.to_string(),
        });
        self.inner.wake.notify_one();

        Ok(task_id)
    }

    /// Cancel a queued task.
    ///
    /// Returns false (and changes nothing) for unknown ids and for tasks that
    /// are running or already terminal. Dependents are left alone; they simply
    /// never become eligible.
    pub fn cancel(&self, task_id: &str) -> bool {
        {
            let mut state = self.inner.state();
            let state = &mut *state;

            let Some(entry) = state.tasks.get_mut(task_id) else {
                return false;
            };
            if entry.record.status != TaskStatus::Queued {
                return false;
            }

            entry.record.completed_at = Some(Utc::now());
            entry.retry_at = None;
            entry.set_status(TaskStatus::Cancelled);

            if let Some(lane) = state.lanes.iter_mut().find(|l| l.name() == entry.record.lane) {
                lane.queued.retain(|id| id != task_id);
            }
        }

        tracing::info!(task_id = %task_id, "Task cancelled");
        self.inner.emit(QueueEvent::Cancelled {
            task_id: task_id.to_string(),
        });
        true
    }

    /// Wait until the task reaches a terminal status and return its record.
    ///
    /// Timing out does not touch the task. Fails with `TaskNotFound` for unknown
    /// ids or when the task is removed by `clear_lane` while waiting.
    pub async fn wait_for(&self, task_id: &str, timeout: Duration) -> Result<TaskRecord> {
        let mut status_rx = {
            let state = self.inner.state();
            let entry = state
                .tasks
                .get(task_id)
                .ok_or_else(|| LaneError::TaskNotFound(task_id.to_string()))?;
            if entry.record.is_finished() {
                return Ok(entry.record.clone());
            }
            entry.status_tx.subscribe()
        };

        let waited = tokio::time::timeout(timeout, async {
            status_rx.wait_for(|status| status.is_terminal()).await.map(|_| ())
        })
        .await;

        match waited {
            Err(_) => Err(LaneError::WaitTimeout {
                task_id: task_id.to_string(),
                timeout,
            }),
            Ok(Err(_)) => Err(LaneError::TaskNotFound(task_id.to_string())),
            Ok(Ok(())) => self
                .get_task(task_id)
                .ok_or_else(|| LaneError::TaskNotFound(task_id.to_string())),
        }
    }

    /// Stop dispatching from a lane. Running tasks are unaffected.
    pub fn pause_lane(&self, lane: &str) -> Result<()> {
        self.set_paused(lane, true)?;
        tracing::info!(lane = %lane, "Lane paused");
        self.inner.emit(QueueEvent::LanePaused { lane: lane.to_string() });
        Ok(())
    }

    pub fn resume_lane(&self, lane: &str) -> Result<()> {
        self.set_paused(lane, false)?;
        tracing::info!(lane = %lane, "Lane resumed");
        self.inner.emit(QueueEvent::LaneResumed { lane: lane.to_string() });
        self.inner.wake.notify_one();
        Ok(())
    }

    fn set_paused(&self, lane: &str, paused: bool) -> Result<()> {
        let mut state = self.inner.state();
        let l = state
            .lane_mut(lane)
            .ok_or_else(|| LaneError::LaneNotFound(lane.to_string()))?;
        l.paused = paused;
        Ok(())
    }

    /// Remove every queued task from a lane. Running tasks are untouched.
    ///
    /// Returns the number of removed tasks.
    pub fn clear_lane(&self, lane: &str) -> Result<usize> {
        let removed = {
            let mut state = self.inner.state();
            let state = &mut *state;
            let l = state
                .lanes
                .iter_mut()
                .find(|l| l.name() == lane)
                .ok_or_else(|| LaneError::LaneNotFound(lane.to_string()))?;

            let ids = std::mem::take(&mut l.queued);
            for id in &ids {
                // Dropping the entry closes its status channel, releasing waiters
                state.tasks.remove(id);
            }
            ids.len()
        };

        tracing::info!(lane = %lane, removed = removed, "Lane cleared");
        self.inner.emit(QueueEvent::LaneCleared {
            lane: lane.to_string(),
            removed,
        });
        Ok(removed)
    }

    pub fn get_lane_status(&self, lane: &str) -> Result<LaneStatus> {
        self.inner
            .state()
            .lane(lane)
            .map(|l| l.status())
            .ok_or_else(|| LaneError::LaneNotFound(lane.to_string()))
    }

    /// Status of every lane, in configuration order.
    pub fn get_all_lane_status(&self) -> Vec<LaneStatus> {
        self.inner.state().lanes.iter().map(|l| l.status()).collect()
    }

    pub fn get_stats(&self) -> QueueStats {
        QueueStats::collect(&self.inner.state())
    }

    pub fn get_task(&self, task_id: &str) -> Option<TaskRecord> {
        self.inner.state().tasks.get(task_id).map(|e| e.record.clone())
    }

    /// Tasks in enqueue order, optionally restricted to one lane.
    pub fn list_tasks(&self, lane: Option<&str>) -> Vec<TaskRecord> {
        let state = self.inner.state();
        let mut entries: Vec<&TaskEntry> = state
            .tasks
            .values()
            .filter(|e| lane.is_none_or(|l| e.record.lane == l))
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.record.clone()).collect()
    }

    pub fn lane_names(&self) -> Vec<String> {
        self.inner.config.lanes.iter().map(|l| l.name.clone()).collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Stop the scheduling loop. Running tasks finish; queued tasks stay queued.
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        tracing::info!("Lane queue shutting down");
    }
}

impl std::fmt::Debug for LaneQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaneQueue")
            .field("lanes", &self.lane_names())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: QueueEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// One scheduling pass: mark selected tasks running and return them.
    fn schedule_pass(&self) -> Vec<TaskRecord> {
        let now = Instant::now();
        let mut dispatched = Vec::new();
        let mut state = self.state();
        let state = &mut *state;

        for lane in state.lanes.iter_mut() {
            let selected = select_for_lane(lane, &state.tasks, now);
            for task_id in selected {
                let Some(entry) = state.tasks.get_mut(&task_id) else {
                    continue;
                };
                entry.retry_at = None;
                entry.record.started_at = Some(Utc::now());
                entry.set_status(TaskStatus::Running);

                lane.queued.retain(|id| id != &task_id);
                lane.running += 1;

                tracing::debug!(
                    task_id = %task_id,
                    lane = %lane.name(),
                    attempt = entry.record.retry_count + 1,
                    running = lane.running,
                    "Dispatching task"
                );
                dispatched.push(entry.record.clone());
            }
        }

        dispatched
    }

    /// How long the loop may sleep before the next pass
    fn next_wait(&self, tick: Duration) -> Duration {
        match self.state().next_retry_at() {
            Some(at) => at.saturating_duration_since(Instant::now()).min(tick),
            None => tick,
        }
    }

    /// Apply an executor outcome to a running task.
    fn finish(&self, task_id: &str, outcome: std::result::Result<RunResult, ExecutorError>) {
        let event = {
            let mut state = self.state();
            let state = &mut *state;

            let Some(entry) = state.tasks.get_mut(task_id) else {
                tracing::warn!(task_id = %task_id, "Finished task no longer registered");
                return;
            };
            let Some(lane) = state.lanes.iter_mut().find(|l| l.name() == entry.record.lane) else {
                return;
            };
            lane.running = lane.running.saturating_sub(1);

            match outcome {
                Ok(result) => {
                    entry.record.result = Some(result);
                    entry.record.error = None;
                    entry.record.completed_at = Some(Utc::now());
                    entry.set_status(TaskStatus::Completed);
                    tracing::info!(task_id = %task_id, lane = %lane.name(), "Task completed");
                    QueueEvent::Completed {
                        task_id: task_id.to_string(),
                        lane: lane.name().to_string(),
                    }
                }
                Err(err) if entry.record.can_retry() => {
                    entry.record.retry_count += 1;
                    let attempt = entry.record.retry_count;
                    let delay = self.config.backoff.delay_for(attempt);

                    entry.record.error = Some(err.message.clone());
                    entry.retry_at = Some(Instant::now() + delay);
                    entry.set_status(TaskStatus::Queued);
                    lane.queued.push(task_id.to_string());

                    tracing::warn!(
                        task_id = %task_id,
                        attempt = attempt,
                        max_retries = entry.record.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Task failed, retrying"
                    );
                    QueueEvent::Retrying {
                        task_id: task_id.to_string(),
                        attempt,
                        delay,
                        error: err.message,
                    }
                }
                Err(err) => {
                    entry.record.error = Some(err.message.clone());
                    entry.record.completed_at = Some(Utc::now());
                    entry.set_status(TaskStatus::Failed);
                    tracing::error!(
                        task_id = %task_id,
                        retries = entry.record.retry_count,
                        error = %err,
                        "Task failed"
                    );
                    QueueEvent::Failed {
                        task_id: task_id.to_string(),
                        error: err.message,
                    }
                }
            }
        };

        self.emit(event);
        self.wake.notify_one();
    }
}

async fn run_scheduler(inner: Weak<Inner>, mut shutdown_rx: watch::Receiver<bool>, tick: Duration) {
    loop {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if *shutdown_rx.borrow() {
            break;
        }

        for task in inner.schedule_pass() {
            inner.emit(QueueEvent::Started {
                task_id: task.id.clone(),
                lane: task.lane.clone(),
                attempt: task.retry_count + 1,
            });
            tokio::spawn(run_task(Arc::clone(&inner), task));
        }

        let wait = inner.next_wait(tick);
        tokio::select! {
            _ = inner.wake.notified() => {}
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_rx.changed() => {}
        }
    }

    tracing::debug!("Lane queue scheduler stopped");
}

/// Execute one task, converting panics and unsuccessful results into failures.
async fn run_task(inner: Arc<Inner>, task: TaskRecord) {
    let outcome = AssertUnwindSafe(inner.executor.execute(&task)).catch_unwind().await;

    let outcome = match outcome {
        Ok(Ok(result)) if result.success => Ok(result),
        Ok(Ok(result)) => Err(ExecutorError::new(
            result.error.unwrap_or_else(|| "executor reported an unsuccessful run".to_string()),
        )),
        Ok(Err(err)) => Err(err),
        Err(panic) => Err(ExecutorError::new(format!("executor panicked: {}", panic_message(&*panic)))),
    };

    inner.finish(&task.id, outcome);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
