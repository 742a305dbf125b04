//! Run result types.
//!
//! A `RunResult` is what an executor hands back for one task or step. It is the
//! only data contract shared with the agent layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::generate_run_id;

/// A file (or other output) produced by an agent run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub path: String,
    pub content: String,
    /// Free-form kind tag ("file", "diff", "report", ...)
    #[serde(rename = "type")]
    pub artifact_type: String,
}

impl Artifact {
    pub fn new(path: impl Into<String>, content: impl Into<String>, artifact_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            artifact_type: artifact_type.into(),
        }
    }

    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, content, "file")
    }
}

/// Outcome of one executor invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub session_id: String,
    pub agent_type: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    pub output: String,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RunResult {
    /// Successful run that started now and has not been stamped with an end yet
    pub fn success(session_id: &str, agent_type: &str, output: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: generate_run_id(),
            session_id: session_id.to_string(),
            agent_type: agent_type.to_string(),
            started_at: now,
            ended_at: now,
            duration_ms: 0,
            success: true,
            output: output.into(),
            artifacts: vec![],
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Run the agent reported as unsuccessful without raising an error
    pub fn failure(session_id: &str, agent_type: &str, error: impl Into<String>) -> Self {
        let mut result = Self::success(session_id, agent_type, String::new());
        result.success = false;
        result.error = Some(error.into());
        result
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Stamp start/end times and duration
    pub fn timed(mut self, started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self.ended_at = ended_at;
        self.duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        self
    }
}
