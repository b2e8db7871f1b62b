//! Error types for orbit-stream.

use thiserror::Error;

/// Errors raised while supervising the event stream.
///
/// Connection failures never cross the public API as `Err` values; they are
/// delivered to subscribers as [`StreamEvent::Error`](crate::StreamEvent::Error).
/// The only place a `StreamError` is returned directly is config validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// Transport-level failure (dropped socket, failed write, refused connection).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered the upgrade request with a plain HTTP response.
    #[error("unexpected handshake response: HTTP {status}")]
    UnexpectedResponse {
        /// HTTP status returned instead of `101 Switching Protocols`.
        status: u16,
    },

    /// The opening handshake did not complete in time.
    #[error("handshake timed out after {timeout_ms} ms")]
    HandshakeTimeout {
        /// Configured handshake timeout.
        timeout_ms: u64,
    },

    /// A received frame was not valid JSON.
    #[error("failed to decode frame: {0}")]
    Decode(String),

    /// An outgoing message could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StreamError {
    /// Whether this error belongs to the recoverable transport class.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::UnexpectedResponse { .. } | Self::HandshakeTimeout { .. }
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::Http(response) => Self::UnexpectedResponse {
                status: response.status().as_u16(),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}
