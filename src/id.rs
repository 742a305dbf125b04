//! ID generation utilities for laneq
//!
//! Provides functions for generating unique identifiers for tasks, runs, and plans.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn generate_prefixed_id(prefix: &str) -> String {
    let timestamp = now_ms();
    let random: u32 = rand::rng().random();
    format!("{}-{}-{:08x}", prefix, timestamp, random)
}

/// Generate a unique task ID
///
/// Format: `task-{timestamp_ms}-{random_hex}`
/// Example: `task-1738300800123-a1b2c3d4`
pub fn generate_task_id() -> String {
    generate_prefixed_id("task")
}

/// Generate a run ID for one executor invocation
///
/// Format: `run-{timestamp_ms}-{random_hex}`
pub fn generate_run_id() -> String {
    generate_prefixed_id("run")
}

/// Generate a plan ID
///
/// Format: `plan-{timestamp_ms}-{random_hex}`
pub fn generate_plan_id() -> String {
    generate_prefixed_id("plan")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_returns_reasonable_timestamp() {
        let ts = now_ms();
        assert!(ts > 1577836800000); // 2020-01-01
        assert!(ts < 4102444800000); // 2100-01-01
    }

    #[test]
    fn test_generate_task_id_format() {
        let id = generate_task_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "task");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_task_id_uniqueness() {
        let ids: std::collections::HashSet<String> = (0..100).map(|_| generate_task_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_generate_run_and_plan_prefixes() {
        assert!(generate_run_id().starts_with("run-"));
        assert!(generate_plan_id().starts_with("plan-"));
    }
}
