//! tokio-tungstenite transport.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, warn};

use crate::config::SupervisorConfig;
use crate::error::StreamError;

use super::transport::{Connector, Outbound, SignalSink, TransportLink, TransportSignal};

/// Close code reported when the connection ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code reported when the peer sent a close frame without a code.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Connector that opens a WebSocket per transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(&self, config: &SupervisorConfig, link: TransportLink) {
        let url = config.url.clone();
        let handshake_timeout = config.handshake_timeout();
        tokio::spawn(async move {
            run_transport(url, handshake_timeout, link).await;
        });
    }
}

async fn run_transport(url: String, handshake_timeout: Duration, link: TransportLink) {
    let TransportLink {
        signals,
        mut outbound,
    } = link;
    let generation = signals.generation();

    debug!(%url, generation, "opening websocket");
    let ws_stream = match timeout(handshake_timeout, connect_async(url.as_str())).await {
        Ok(Ok((ws_stream, _response))) => ws_stream,
        Ok(Err(e)) => {
            fail(&signals, StreamError::from(e));
            return;
        }
        Err(_) => {
            fail(
                &signals,
                StreamError::HandshakeTimeout {
                    timeout_ms: u64::try_from(handshake_timeout.as_millis()).unwrap_or(u64::MAX),
                },
            );
            return;
        }
    };

    if !signals.emit(TransportSignal::Open) {
        // Detached while the handshake was in flight.
        debug!(generation, "transport detached before open, dropping socket");
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        signals.emit(TransportSignal::Message(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            signals.emit(TransportSignal::Message(text));
                        }
                        Err(e) => {
                            signals.emit(TransportSignal::Error(StreamError::Decode(e.to_string())));
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = close_details(frame);
                        signals.emit(TransportSignal::Close { code, reason });
                        return;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong are answered by tungstenite
                    }
                    Some(Err(e)) => {
                        fail(&signals, StreamError::from(e));
                        return;
                    }
                    None => {
                        signals.emit(TransportSignal::Close {
                            code: ABNORMAL_CLOSURE,
                            reason: "connection closed".to_string(),
                        });
                        return;
                    }
                }
            }

            request = outbound.recv() => {
                match request {
                    Some(Outbound::Frame(text)) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            fail(&signals, StreamError::from(e));
                            return;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        debug!(generation, "closing websocket");
                        if let Err(e) = write.send(Message::Close(None)).await {
                            warn!(generation, error = %e, "failed to send close frame");
                        }
                        return;
                    }
                }
            }
        }
    }
}

/// Report an error followed by an abnormal close, as a browser-style socket would.
fn fail(signals: &SignalSink, error: StreamError) {
    debug!(generation = signals.generation(), error = %error, "transport failed");
    signals.emit(TransportSignal::Error(error));
    signals.emit(TransportSignal::Close {
        code: ABNORMAL_CLOSURE,
        reason: String::new(),
    });
}

fn close_details(frame: Option<CloseFrame>) -> (u16, String) {
    frame.map_or_else(
        || (NO_STATUS_RECEIVED, String::new()),
        |f| (u16::from(f.code), f.reason.as_str().to_owned()),
    )
}
