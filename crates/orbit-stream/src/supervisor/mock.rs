//! In-memory connector for supervisor tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::SupervisorConfig;
use crate::error::StreamError;

use super::transport::{Connector, Outbound, SignalSink, TransportLink, TransportSignal};

/// Connector whose transports are driven by the test.
pub(crate) struct MockConnector {
    created: mpsc::UnboundedSender<MockTransport>,
    sinks: Arc<Mutex<Vec<SignalSink>>>,
    overlaps: Arc<AtomicUsize>,
}

/// Test side of the mock connector.
pub(crate) struct MockTransports {
    created: mpsc::UnboundedReceiver<MockTransport>,
    overlaps: Arc<AtomicUsize>,
}

/// One simulated connection.
pub(crate) struct MockTransport {
    pub(crate) url: String,
    signals: SignalSink,
    outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl MockConnector {
    pub(crate) fn new() -> (Self, MockTransports) {
        let (tx, rx) = mpsc::unbounded_channel();
        let overlaps = Arc::new(AtomicUsize::new(0));
        (
            Self {
                created: tx,
                sinks: Arc::new(Mutex::new(Vec::new())),
                overlaps: Arc::clone(&overlaps),
            },
            MockTransports {
                created: rx,
                overlaps,
            },
        )
    }
}

impl Connector for MockConnector {
    fn connect(&self, config: &SupervisorConfig, link: TransportLink) {
        let mut sinks = self.sinks.lock();
        // Every earlier transport must already be detached.
        let still_attached = sinks.iter().filter(|s| s.is_attached()).count();
        self.overlaps.fetch_add(still_attached, Ordering::SeqCst);
        sinks.push(link.signals.clone());

        let _ = self.created.send(MockTransport {
            url: config.url.clone(),
            signals: link.signals,
            outbound: link.outbound,
        });
    }
}

impl MockTransports {
    /// Wait for the supervisor to create the next transport.
    pub(crate) async fn next(&mut self) -> MockTransport {
        tokio::time::timeout(Duration::from_secs(3600), self.created.recv())
            .await
            .expect("timed out waiting for a transport")
            .expect("connector dropped")
    }

    /// A transport created without waiting, if any.
    pub(crate) fn try_next(&mut self) -> Option<MockTransport> {
        self.created.try_recv().ok()
    }

    /// Times a transport was created while an older one was still attached.
    pub(crate) fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

impl MockTransport {
    pub(crate) fn open(&self) {
        self.signals.emit(TransportSignal::Open);
    }

    pub(crate) fn message(&self, text: impl Into<String>) {
        self.signals.emit(TransportSignal::Message(text.into()));
    }

    pub(crate) fn error(&self, message: &str) {
        self.signals
            .emit(TransportSignal::Error(StreamError::Transport(message.to_string())));
    }

    pub(crate) fn fail_with(&self, error: StreamError) {
        self.signals.emit(TransportSignal::Error(error));
    }

    pub(crate) fn close(&self, code: u16) -> bool {
        self.signals.emit(TransportSignal::Close {
            code,
            reason: String::new(),
        })
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.signals.is_attached()
    }

    /// Wait for the next text frame written by the supervisor.
    pub(crate) async fn next_frame(&mut self) -> String {
        loop {
            let outbound = tokio::time::timeout(Duration::from_secs(3600), self.outbound.recv())
                .await
                .expect("timed out waiting for a frame")
                .expect("transport handle dropped");
            if let Outbound::Frame(text) = outbound {
                return text;
            }
        }
    }

    /// Text frames already written, without waiting.
    pub(crate) fn written_frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(outbound) = self.outbound.try_recv() {
            if let Outbound::Frame(text) = outbound {
                frames.push(text);
            }
        }
        frames
    }
}
