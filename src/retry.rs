use std::time::Duration;

/// Total prompt attempts, the first one included.
pub const MAX_ATTEMPTS: u32 = 4;
/// Pause before each retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Bounded refresh-and-retry policy for prompts whose stream never completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Whether another attempt may follow the zero-based `attempt` that just failed.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }
}
