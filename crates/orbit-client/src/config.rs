//! Client configuration.
//!
//! A [`ClientConfig`] is never mutated in place. [`ClientConfig::updated`]
//! merges a partial update into a copy, which keeps a config handed to a
//! running stream stable.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use orbit_stream::SupervisorConfig;
use orbit_stream::config::{DEFAULT_STREAM_URL, TransportOptions};

use crate::error::OrbitError;

/// Default REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.orbitbhyve.com";

/// Reconnect tuning for the event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the reconnect delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Attempts allowed before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

/// Orbit client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Event stream WebSocket URL.
    pub wss_url: String,
    /// REST API base URL.
    pub base_url: String,
    /// REST request timeout, in milliseconds.
    pub timeout_ms: u64,
    /// WebSocket handshake timeout, in milliseconds.
    pub ws_timeout_ms: u64,
    /// Heartbeat interval on the event stream, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Reconnect tuning.
    pub reconnect: ReconnectConfig,
    /// Verbose logging.
    pub debug: bool,
    /// Account email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Account password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            wss_url: DEFAULT_STREAM_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
            ws_timeout_ms: 10_000,
            heartbeat_interval_ms: 25_000,
            reconnect: ReconnectConfig::default(),
            debug: false,
            email: None,
            password: None,
        }
    }
}

/// Partial update for [`ClientConfig::updated`]. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfigUpdate {
    /// New event stream URL.
    pub wss_url: Option<String>,
    /// New REST base URL.
    pub base_url: Option<String>,
    /// New REST timeout.
    pub timeout_ms: Option<u64>,
    /// New handshake timeout.
    pub ws_timeout_ms: Option<u64>,
    /// New heartbeat interval.
    pub heartbeat_interval_ms: Option<u64>,
    /// New reconnect tuning.
    pub reconnect: Option<ReconnectConfig>,
    /// New debug flag.
    pub debug: Option<bool>,
    /// New account email.
    pub email: Option<String>,
    /// New account password.
    pub password: Option<String>,
}

impl ClientConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OrbitError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            OrbitError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> Result<Self, OrbitError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| OrbitError::Config(format!("invalid JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, OrbitError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), OrbitError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| OrbitError::Config(format!("invalid base_url '{}': {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(OrbitError::Config(format!(
                "base_url must use http or https, got '{}'",
                base.scheme()
            )));
        }

        if self.timeout_ms == 0 {
            return Err(OrbitError::Config("timeout_ms must be positive".to_string()));
        }

        if self.ws_timeout_ms == 0 {
            return Err(OrbitError::Config(
                "ws_timeout_ms must be positive".to_string(),
            ));
        }

        self.stream_config()
            .validate()
            .map_err(|e| OrbitError::Config(e.to_string()))
    }

    /// Return a copy with `update` merged in.
    #[must_use]
    pub fn updated(&self, update: ClientConfigUpdate) -> Self {
        let current = self.clone();
        Self {
            wss_url: update.wss_url.unwrap_or(current.wss_url),
            base_url: update.base_url.unwrap_or(current.base_url),
            timeout_ms: update.timeout_ms.unwrap_or(current.timeout_ms),
            ws_timeout_ms: update.ws_timeout_ms.unwrap_or(current.ws_timeout_ms),
            heartbeat_interval_ms: update
                .heartbeat_interval_ms
                .unwrap_or(current.heartbeat_interval_ms),
            reconnect: update.reconnect.unwrap_or(current.reconnect),
            debug: update.debug.unwrap_or(current.debug),
            email: update.email.or(current.email),
            password: update.password.or(current.password),
        }
    }

    /// REST request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Supervisor configuration for the event stream.
    #[must_use]
    pub fn stream_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            url: self.wss_url.clone(),
            transport: TransportOptions {
                handshake_timeout_ms: self.ws_timeout_ms,
            },
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            base_delay_ms: self.reconnect.base_delay_ms,
            max_delay_ms: self.reconnect.max_delay_ms,
            max_attempts: self.reconnect.max_attempts,
        }
    }

    /// Email and password, if both are set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_service() {
        let config = ClientConfig::default();

        assert_eq!(config.wss_url, "wss://api.orbitbhyve.com/v1/events");
        assert_eq!(config.base_url, "https://api.orbitbhyve.com");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.ws_timeout_ms, 10_000);
        assert_eq!(config.heartbeat_interval_ms, 25_000);
        assert_eq!(config.reconnect, ReconnectConfig::default());
        assert!(!config.debug);
        assert!(config.credentials().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ClientConfig::from_json(r#"{"email": "me@example.com", "debug": true}"#)
            .expect("valid config");

        assert_eq!(config.email.as_deref(), Some("me@example.com"));
        assert!(config.debug);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_from_json_partial_reconnect() {
        let config = ClientConfig::from_json(r#"{"reconnect": {"max_attempts": 10}}"#)
            .expect("valid config");

        assert_eq!(config.reconnect.max_attempts, 10);
        assert_eq!(config.reconnect.base_delay_ms, 1_000);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = ClientConfig::from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let config = ClientConfig {
            base_url: "ftp://api.orbitbhyve.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            base_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_stream_settings() {
        let config = ClientConfig {
            wss_url: "https://api.orbitbhyve.com/v1/events".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            heartbeat_interval_ms: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            timeout_ms: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_updated_merges_without_mutating() {
        let original = ClientConfig::default();
        let updated = original.updated(ClientConfigUpdate {
            email: Some("me@example.com".to_string()),
            password: Some("hunter2".to_string()),
            timeout_ms: Some(2_000),
            ..ClientConfigUpdate::default()
        });

        assert_eq!(original, ClientConfig::default());
        assert_eq!(updated.credentials(), Some(("me@example.com", "hunter2")));
        assert_eq!(updated.timeout(), Duration::from_secs(2));
        assert_eq!(updated.wss_url, original.wss_url);
    }

    #[test]
    fn test_updated_keeps_credentials_when_absent() {
        let config = ClientConfig {
            email: Some("me@example.com".to_string()),
            ..ClientConfig::default()
        };
        let updated = config.updated(ClientConfigUpdate {
            debug: Some(true),
            ..ClientConfigUpdate::default()
        });

        assert_eq!(updated.email.as_deref(), Some("me@example.com"));
        assert!(updated.debug);
    }

    #[test]
    fn test_stream_config_mapping() {
        let config = ClientConfig {
            wss_url: "ws://localhost:9000/v1/events".to_string(),
            ws_timeout_ms: 3_000,
            heartbeat_interval_ms: 5_000,
            reconnect: ReconnectConfig {
                base_delay_ms: 200,
                max_delay_ms: 2_000,
                max_attempts: 2,
            },
            ..ClientConfig::default()
        };

        let stream = config.stream_config();
        assert_eq!(stream.url, "ws://localhost:9000/v1/events");
        assert_eq!(stream.handshake_timeout(), Duration::from_secs(3));
        assert_eq!(stream.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(stream.base_delay(), Duration::from_millis(200));
        assert_eq!(stream.max_delay_ms, 2_000);
        assert_eq!(stream.max_attempts, 2);
    }

    #[test]
    fn test_to_json_omits_missing_credentials() {
        let json = ClientConfig::default().to_json().expect("serialize");
        assert!(!json.contains("password"));
        assert!(json.contains("wss_url"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"wss_url": "wss://example.test/v1/events"}}"#).expect("write");

        let config = ClientConfig::from_file(file.path()).expect("load");
        assert_eq!(config.wss_url, "wss://example.test/v1/events");
    }

    #[test]
    fn test_from_file_missing() {
        let err = ClientConfig::from_file("/nonexistent/orbit.json").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
