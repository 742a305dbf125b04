//! Executors: the seam between the scheduling core and agent logic.
//!
//! - `TaskExecutor` runs one queued task for the Lane Queue.
//! - `AgentExecutor` runs one plan step for the orchestrator.
//! - `QueueAgentExecutor` implements the latter on top of the former.

mod echo;
mod mock;
mod queued;
mod traits;

pub use echo::EchoExecutor;
pub use mock::{MockCall, MockExecutor};
pub use queued::{DEFAULT_WAIT_TIMEOUT, QueueAgentExecutor};
pub use traits::{AgentExecutor, ExecutorError, TaskExecutor};
