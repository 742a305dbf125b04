//! Dry-run executor: reflects the input back as output.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{RunResult, TaskRecord};
use crate::executor::{AgentExecutor, ExecutorError, TaskExecutor};

#[derive(Debug, Clone, Default)]
pub struct EchoExecutor;

impl EchoExecutor {
    fn echo(agent_type: &str, input: &str, session_id: &str) -> RunResult {
        let now = Utc::now();
        RunResult::success(session_id, agent_type, format!("[{}] {}", agent_type, input))
            .with_metadata("dry_run", serde_json::Value::Bool(true))
            .timed(now, Utc::now())
    }
}

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(&self, task: &TaskRecord) -> Result<RunResult, ExecutorError> {
        Ok(Self::echo(&task.agent_type, &task.input, &task.session_id))
    }
}

#[async_trait]
impl AgentExecutor for EchoExecutor {
    async fn execute(&self, agent_type: &str, input: &str, session_id: &str) -> Result<RunResult, ExecutorError> {
        Ok(Self::echo(agent_type, input, session_id))
    }
}
