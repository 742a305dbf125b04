//! YAML configuration for laneq.
//!
//! Loaded with a fallback chain: explicit path, then
//! `~/.config/laneq/laneq.yml`, then `./laneq.yml`, else defaults. Every
//! section is optional in the file.

use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY};
use crate::executor::QueueAgentExecutor;
use crate::orchestrator::{DEFAULT_AGENT_TYPE, OrchestratorConfig};
use crate::queue::{DEFAULT_RETRY_MAX_DELAY, LANE_MAIN, LaneConfig, LaneQueue, QueueConfig, RetryBackoff, default_lanes};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub lanes: Vec<LaneConfig>,
    pub queue: QueueSection,
    pub orchestrator: OrchestratorSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub default_priority: i32,
    pub default_max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub tick_interval_ms: u64,
    pub event_capacity: usize,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            default_priority: DEFAULT_PRIORITY,
            default_max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: 1000,
            tick_interval_ms: 50,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub retry_base_delay_ms: u64,
    pub max_step_retries: u32,
    pub default_agent_type: String,
    /// Lane that plan steps are dispatched to
    pub dispatch_lane: String,
    /// 0 disables the per-step timeout
    pub step_timeout_ms: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: 1000,
            max_step_retries: 2,
            default_agent_type: DEFAULT_AGENT_TYPE.to_string(),
            dispatch_lane: LANE_MAIN.to_string(),
            step_timeout_ms: 600_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            lanes: default_lanes(),
            queue: QueueSection::default(),
            orchestrator: OrchestratorSection::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject configurations the queue would refuse to start with
    pub fn validate(&self) -> Result<()> {
        self.queue_config().validate()?;

        if !self.lanes.iter().any(|l| l.name == self.orchestrator.dispatch_lane) {
            bail!("orchestrator.dispatch_lane '{}' is not a configured lane", self.orchestrator.dispatch_lane);
        }

        Ok(())
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            lanes: self.lanes.clone(),
            default_priority: self.queue.default_priority,
            default_max_retries: self.queue.default_max_retries,
            backoff: RetryBackoff::new(
                Duration::from_millis(self.queue.retry_base_delay_ms),
                DEFAULT_RETRY_MAX_DELAY,
            ),
            tick_interval: Duration::from_millis(self.queue.tick_interval_ms),
            event_capacity: self.queue.event_capacity,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let step_timeout = match self.orchestrator.step_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        OrchestratorConfig {
            retry_base_delay: Duration::from_millis(self.orchestrator.retry_base_delay_ms),
            max_step_retries: self.orchestrator.max_step_retries,
            default_agent_type: self.orchestrator.default_agent_type.clone(),
            step_timeout,
        }
    }

    /// Step executor dispatching into the configured lane; its queue wait
    /// follows `step_timeout_ms`, and 0 means wait for as long as it takes
    pub fn dispatch_executor(&self, queue: LaneQueue) -> QueueAgentExecutor {
        let executor = QueueAgentExecutor::new(queue).with_lane(self.orchestrator.dispatch_lane.clone());
        match self.orchestrator.step_timeout_ms {
            0 => executor.without_wait_timeout(),
            ms => executor.with_wait_timeout(Duration::from_millis(ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.lanes.len(), 3);
        assert_eq!(config.queue.default_priority, 5);
        assert_eq!(config.orchestrator.dispatch_lane, "main");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_path() {
        let file = write_config(
            r#"
log_level: debug
lanes:
  - name: main
    max_concurrent: 2
  - name: gpu
    max_concurrent: 1
queue:
  default_max_retries: 1
orchestrator:
  max_step_retries: 0
  step_timeout_ms: 0
"#,
        );

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.lanes.len(), 2);
        assert_eq!(config.queue.default_max_retries, 1);
        // Unset fields keep their defaults
        assert_eq!(config.queue.tick_interval_ms, 50);
        assert_eq!(config.orchestrator.default_agent_type, "code-writer");

        let orch = config.orchestrator_config();
        assert_eq!(orch.max_step_retries, 0);
        assert!(orch.step_timeout.is_none());
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/laneq.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_invalid_lane_config_rejected() {
        let file = write_config(
            r#"
lanes:
  - name: main
    max_concurrent: 0
"#,
        );
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_dispatch_lane_must_exist() {
        let file = write_config(
            r#"
orchestrator:
  dispatch_lane: gpu
"#,
        );
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_queue_config_conversion() {
        let mut config = Config::default();
        config.queue.retry_base_delay_ms = 250;
        config.queue.tick_interval_ms = 10;

        let queue = config.queue_config();
        assert_eq!(queue.backoff.base_delay, Duration::from_millis(250));
        assert_eq!(queue.tick_interval, Duration::from_millis(10));
        assert_eq!(queue.lanes, default_lanes());
    }

    #[tokio::test]
    async fn test_dispatch_executor_wait_follows_step_timeout() {
        let mut config = Config::default();
        let queue = LaneQueue::with_default_lanes(std::sync::Arc::new(crate::executor::EchoExecutor)).unwrap();

        let executor = config.dispatch_executor(queue.clone());
        assert_eq!(executor.lane(), "main");
        assert_eq!(executor.wait_timeout(), Some(Duration::from_secs(600)));

        config.orchestrator.step_timeout_ms = 0;
        assert_eq!(config.dispatch_executor(queue.clone()).wait_timeout(), None);
        assert!(config.orchestrator_config().step_timeout.is_none());

        queue.shutdown();
    }
}
