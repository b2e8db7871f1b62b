//! Error types for orbit-client.

use serde_json::Value;
use thiserror::Error;

use orbit_stream::StreamError;

/// Errors raised by the Orbit client.
#[derive(Debug, Error)]
pub enum OrbitError {
    /// The API answered with a non-success status.
    #[error("{message}{}", .status_code.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api {
        /// What the client was doing.
        message: String,
        /// HTTP status, when the request got that far.
        status_code: Option<u16>,
        /// Decoded response body, when it was JSON.
        response_body: Option<Value>,
    },

    /// The HTTP request could not be completed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation needed a session before `authenticate` succeeded.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The account has no devices.
    #[error("no devices found for user {user_id}")]
    NoDevices {
        /// Account that was queried.
        user_id: String,
    },

    /// Event stream error.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OrbitError {
    /// Build an [`OrbitError::Api`].
    #[must_use]
    pub fn api(
        message: impl Into<String>,
        status_code: Option<u16>,
        response_body: Option<Value>,
    ) -> Self {
        Self::Api {
            message: message.into(),
            status_code,
            response_body,
        }
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => *status_code,
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Response body carried by the error, if any.
    #[must_use]
    pub const fn response_body(&self) -> Option<&Value> {
        match self {
            Self::Api { response_body, .. } => response_body.as_ref(),
            _ => None,
        }
    }
}
