//! Stream event types.

use std::time::Duration;

use serde_json::Value;

use crate::error::StreamError;

/// Notifications delivered to stream subscribers, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The transport opened.
    Open,
    /// A frame arrived from the service, decoded as JSON.
    Message(Value),
    /// Something went wrong. Transport errors are followed by recovery;
    /// decode errors leave the connection untouched.
    Error(StreamError),
    /// The transport closed.
    Close {
        /// WebSocket close code (1006 for abnormal closure).
        code: u16,
        /// Close reason sent by the peer, possibly empty.
        reason: String,
    },
    /// A reconnect has been scheduled.
    ReconnectAttempt {
        /// 1-based number of the attempt that will start when the delay elapses.
        attempt: u32,
        /// Delay before that attempt starts.
        delay: Duration,
    },
    /// Reconnect attempts are exhausted; call `connect()` to start over.
    MaxReconnectAttemptsReached,
}

impl StreamEvent {
    /// Notification name, as used in logs and CLI output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Message(_) => "message",
            Self::Error(_) => "error",
            Self::Close { .. } => "close",
            Self::ReconnectAttempt { .. } => "reconnect_attempt",
            Self::MaxReconnectAttemptsReached => "max_reconnect_attempts_reached",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names() {
        assert_eq!(StreamEvent::Open.name(), "open");
        assert_eq!(StreamEvent::Message(json!({})).name(), "message");
        assert_eq!(
            StreamEvent::Error(StreamError::Decode("x".into())).name(),
            "error"
        );
        assert_eq!(
            StreamEvent::Close {
                code: 1006,
                reason: String::new()
            }
            .name(),
            "close"
        );
        assert_eq!(
            StreamEvent::ReconnectAttempt {
                attempt: 1,
                delay: Duration::from_secs(1)
            }
            .name(),
            "reconnect_attempt"
        );
        assert_eq!(
            StreamEvent::MaxReconnectAttemptsReached.name(),
            "max_reconnect_attempts_reached"
        );
    }

    #[test]
    fn test_reconnect_attempt_fields() {
        let event = StreamEvent::ReconnectAttempt {
            attempt: 3,
            delay: Duration::from_secs(4),
        };
        if let StreamEvent::ReconnectAttempt { attempt, delay } = event {
            assert_eq!(attempt, 3);
            assert_eq!(delay, Duration::from_secs(4));
        } else {
            panic!("expected ReconnectAttempt");
        }
    }
}
