//! Supervisor configuration.
//!
//! A [`SupervisorConfig`] is immutable for the lifetime of one connection
//! attempt. It can be replaced wholesale between attempts; the new value is
//! picked up the next time a transport is created.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StreamError;
use crate::supervisor::BackoffPolicy;

/// Default event stream endpoint.
pub const DEFAULT_STREAM_URL: &str = "wss://api.orbitbhyve.com/v1/events";
/// Default interval between keepalive frames.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 25_000;
/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
/// Default upper bound for the reconnect delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default opening handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

/// Options handed to the transport when it is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransportOptions {
    /// Time allowed for the opening handshake, in milliseconds.
    pub handshake_timeout_ms: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        }
    }
}

/// Configuration for a [`ConnectionSupervisor`](crate::ConnectionSupervisor).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// WebSocket URL of the event stream.
    pub url: String,
    /// Transport-level options.
    pub transport: TransportOptions,
    /// Interval between heartbeat frames, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Delay before the first reconnect attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the reconnect delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Reconnect attempts allowed before the supervisor stops for good.
    pub max_attempts: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            transport: TransportOptions::default(),
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl SupervisorConfig {
    /// Create a configuration for `url` with default timings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = duration_ms(interval);
        self
    }

    /// Set the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        self.base_delay_ms = duration_ms(base_delay);
        self.max_delay_ms = duration_ms(max_delay);
        self.max_attempts = max_attempts;
        self
    }

    /// Set the handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.transport.handshake_timeout_ms = duration_ms(timeout);
        self
    }

    /// Heartbeat interval as a [`Duration`].
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Handshake timeout as a [`Duration`].
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.transport.handshake_timeout_ms)
    }

    /// Base reconnect delay as a [`Duration`].
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// The backoff policy described by this configuration.
    #[must_use]
    pub const fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.url.is_empty() {
            return Err(StreamError::Config("url cannot be empty".to_string()));
        }

        let url = Url::parse(&self.url)
            .map_err(|e| StreamError::Config(format!("invalid url '{}': {e}", self.url)))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(StreamError::Config(
                "url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.heartbeat_interval_ms == 0 {
            return Err(StreamError::Config(
                "heartbeat_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.base_delay_ms == 0 {
            return Err(StreamError::Config(
                "base_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(StreamError::Config(
                "max_delay_ms cannot be less than base_delay_ms".to_string(),
            ));
        }

        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
