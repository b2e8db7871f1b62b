//! Heartbeat/keepalive timer.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Shortest period a timer will run with.
pub const MIN_HEARTBEAT_PERIOD: Duration = Duration::from_millis(1);
/// Longest period a timer will run with.
pub const MAX_HEARTBEAT_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Periodic keepalive timer bound to one transport generation.
///
/// The first tick fires one full `period` after [`start`](Self::start); there
/// is no immediate tick. Dropping the timer is the only way to stop it.
#[derive(Debug)]
pub struct HeartbeatTimer {
    interval: Interval,
    period: Duration,
    generation: u64,
}

impl HeartbeatTimer {
    /// Start a timer for the transport identified by `generation`.
    ///
    /// `period` is clamped to
    /// [`MIN_HEARTBEAT_PERIOD`]..=[`MAX_HEARTBEAT_PERIOD`].
    #[must_use]
    pub fn start(period: Duration, generation: u64) -> Self {
        let period = period.clamp(MIN_HEARTBEAT_PERIOD, MAX_HEARTBEAT_PERIOD);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            period,
            generation,
        }
    }

    /// Wait for the next tick. Cancel safe.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }

    /// Interval between ticks, after clamping.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Generation of the transport this timer is bound to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}
