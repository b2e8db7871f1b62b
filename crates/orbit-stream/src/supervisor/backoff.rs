//! Reconnect backoff and reconnect bookkeeping.

use std::time::Duration;

/// Exponential backoff: `min(base * 2^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

impl BackoffPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Delay before the first reconnect attempt.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound on any delay.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay to wait after `attempt` reconnect attempts have already been made.
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Mutable reconnect bookkeeping owned by the supervisor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectState {
    /// Reconnect attempts made since the last successful open.
    pub attempts: u32,
    /// Delay used for the most recent schedule; reset to base on open.
    pub current_delay: Duration,
    /// Whether a failure schedules a retry or stops the supervisor.
    pub should_reconnect: bool,
}

impl ReconnectState {
    /// Fresh, disarmed state.
    #[must_use]
    pub const fn new(base_delay: Duration) -> Self {
        Self {
            attempts: 0,
            current_delay: base_delay,
            should_reconnect: false,
        }
    }

    /// Enable automatic recovery and start counting from zero.
    pub fn arm(&mut self, base_delay: Duration) {
        self.should_reconnect = true;
        self.reset(base_delay);
    }

    /// Forget previous failures after a successful open.
    pub fn reset(&mut self, base_delay: Duration) {
        self.attempts = 0;
        self.current_delay = base_delay;
    }

    /// Disable automatic recovery.
    pub fn disarm(&mut self) {
        self.should_reconnect = false;
    }

    /// Whether another reconnect may be scheduled.
    #[must_use]
    pub const fn can_retry(&self, max_attempts: u32) -> bool {
        self.should_reconnect && self.attempts < max_attempts
    }
}
