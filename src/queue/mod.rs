//! Lane Queue: lane-scoped, priority-ordered, dependency-aware task scheduling.
//!
//! This module provides:
//! - **Lanes**: named execution contexts, each with its own concurrency limit.
//! - **Selection**: per-lane candidate ordering by priority, then FIFO, gated on
//!   completed dependencies.
//! - **Retry backoff**: failed tasks are requeued with a linearly growing delay.
//! - **LaneQueue**: the shared handle that admits tasks and drives dispatch.
//!
//! # Architecture
//!
//! All task and lane state lives behind one mutex. A single scheduling loop
//! selects eligible tasks on each pass and spawns one executor call per task;
//! completions report back under the same lock and wake the loop. Callers
//! waiting on a task subscribe to its status channel instead of polling.
//!
//! # Example
//!
//! ```ignore
//! use laneq::executor::EchoExecutor;
//! use laneq::queue::LaneQueue;
//!
//! let queue = LaneQueue::with_default_lanes(Arc::new(EchoExecutor))?;
//! let id = queue.enqueue("code-writer", "Write a parser", "main", "session-1", TaskOptions::new())?;
//! let record = queue.wait_for(&id, Duration::from_secs(30)).await?;
//! ```

mod backoff;
mod events;
mod lane;
mod manager;
mod select;
mod state;
mod stats;

pub use backoff::{DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_DELAY, RetryBackoff};
pub use events::QueueEvent;
pub use lane::{DEFAULT_PARALLEL_LIMIT, LANE_MAIN, LANE_PARALLEL, LANE_PLANNER, LaneConfig, LaneKind, LaneStatus, default_lanes};
pub use manager::{LaneQueue, QueueConfig};
pub use stats::QueueStats;
