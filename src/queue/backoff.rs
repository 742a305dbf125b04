//! Retry backoff for failed tasks.
//!
//! The delay grows linearly with the attempt number (base * attempt) and is
//! capped, so a flapping executor cannot push a retry out indefinitely.

use std::time::Duration;

/// Default delay before the first retry
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Upper bound for any single retry delay
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl RetryBackoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self { base_delay, max_delay }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt.max(1))
            .min(self.max_delay)
    }
}
