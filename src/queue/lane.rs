//! Lane definitions.
//!
//! A lane is a named execution context with its own concurrency limit and
//! paused flag. Lanes are created with the queue and never destroyed.

use serde::{Deserialize, Serialize};

/// Lane for planning agents (serial)
pub const LANE_PLANNER: &str = "planner";
/// Lane for the main agent flow (serial)
pub const LANE_MAIN: &str = "main";
/// Lane for independent fan-out work
pub const LANE_PARALLEL: &str = "parallel";

/// Default concurrency of the `parallel` lane
pub const DEFAULT_PARALLEL_LIMIT: usize = 4;

/// Static definition of a lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneConfig {
    pub name: String,
    /// Maximum tasks in `running` at once (at least 1)
    pub max_concurrent: usize,
}

impl LaneConfig {
    pub fn new(name: impl Into<String>, max_concurrent: usize) -> Self {
        Self {
            name: name.into(),
            max_concurrent,
        }
    }

    /// One task at a time
    pub fn serial(name: impl Into<String>) -> Self {
        Self::new(name, 1)
    }

    pub fn kind(&self) -> LaneKind {
        if self.max_concurrent <= 1 {
            LaneKind::Serial
        } else {
            LaneKind::Concurrent
        }
    }
}

/// The fixed lane set: `planner` and `main` run serially, `parallel` fans out.
pub fn default_lanes() -> Vec<LaneConfig> {
    vec![
        LaneConfig::serial(LANE_PLANNER),
        LaneConfig::serial(LANE_MAIN),
        LaneConfig::new(LANE_PARALLEL, DEFAULT_PARALLEL_LIMIT),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneKind {
    Serial,
    Concurrent,
}

impl LaneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaneKind::Serial => "serial",
            LaneKind::Concurrent => "concurrent",
        }
    }
}

impl std::fmt::Display for LaneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable lane state owned by the queue.
#[derive(Debug, Clone)]
pub(crate) struct Lane {
    pub config: LaneConfig,
    pub paused: bool,
    /// Tasks currently handed to the executor
    pub running: usize,
    /// Ids of queued tasks (including ones waiting out a retry backoff)
    pub queued: Vec<String>,
}

impl Lane {
    pub fn new(config: LaneConfig) -> Self {
        Self {
            config,
            paused: false,
            running: 0,
            queued: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Free dispatch slots; zero while paused
    pub fn available_slots(&self) -> usize {
        if self.paused {
            return 0;
        }
        self.config.max_concurrent.saturating_sub(self.running)
    }

    pub fn status(&self) -> LaneStatus {
        LaneStatus {
            name: self.config.name.clone(),
            kind: self.config.kind(),
            max_concurrent: self.config.max_concurrent,
            queued: self.queued.len(),
            running: self.running,
            paused: self.paused,
        }
    }
}

/// Point-in-time view of a lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneStatus {
    pub name: String,
    pub kind: LaneKind,
    pub max_concurrent: usize,
    pub queued: usize,
    pub running: usize,
    pub paused: bool,
}
