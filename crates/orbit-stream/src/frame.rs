//! Text frame codec for the event stream.
//!
//! Frames are single-line JSON documents. Outgoing control frames are typed
//! ([`Frame`]); incoming frames are decoded to a plain [`serde_json::Value`]
//! and handed to subscribers untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StreamError;

/// Control frames sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Frame {
    /// Keepalive frame: `{"event":"ping"}`.
    Ping,
    /// Authenticated handshake sent right after the stream opens.
    AppConnection {
        /// Session token obtained from the REST login.
        orbit_session_token: String,
    },
}

impl Frame {
    /// The keepalive frame.
    #[must_use]
    pub const fn ping() -> Self {
        Self::Ping
    }

    /// The handshake frame for `token`.
    #[must_use]
    pub fn app_connection(token: impl Into<String>) -> Self {
        Self::AppConnection {
            orbit_session_token: token.into(),
        }
    }

    /// Encode this frame to wire text.
    pub fn to_text(&self) -> Result<String, StreamError> {
        encode(self)
    }
}

/// Encode `message` as a single-line JSON text frame.
pub fn encode<T: Serialize + ?Sized>(message: &T) -> Result<String, StreamError> {
    serde_json::to_string(message).map_err(|e| StreamError::Encode(e.to_string()))
}

/// Decode a received text frame.
pub fn decode(text: &str) -> Result<Value, StreamError> {
    serde_json::from_str(text).map_err(|e| StreamError::Decode(e.to_string()))
}
