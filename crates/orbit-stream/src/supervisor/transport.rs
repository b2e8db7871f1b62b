//! Transport abstraction.
//!
//! A [`Connector`] starts one connection per call and reports its lifecycle
//! through a [`SignalSink`]. The supervisor keeps the matching
//! [`TransportHandle`]; handles are replaced on every reconnect, never reused.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::config::SupervisorConfig;
use crate::error::StreamError;

/// Lifecycle signal raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// Handshake completed.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The transport failed.
    Error(StreamError),
    /// The transport closed.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
}

/// Request sent from the supervisor to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write one text frame.
    Frame(String),
    /// Close the connection gracefully.
    Close,
}

pub(crate) type SignalSender = mpsc::UnboundedSender<(u64, TransportSignal)>;

/// Sending side of a transport's lifecycle signals.
///
/// Once the supervisor detaches the transport, [`emit`](Self::emit) becomes a
/// no-op.
#[derive(Debug, Clone)]
pub struct SignalSink {
    generation: u64,
    attached: Arc<AtomicBool>,
    tx: SignalSender,
}

impl SignalSink {
    /// Generation of the transport this sink belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the supervisor still listens to this transport.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Report a signal. Returns `false` if nobody is listening any more.
    pub fn emit(&self, signal: TransportSignal) -> bool {
        if !self.is_attached() {
            return false;
        }
        self.tx.send((self.generation, signal)).is_ok()
    }
}

/// Everything a connector needs to drive one connection.
#[derive(Debug)]
pub struct TransportLink {
    /// Where lifecycle signals go.
    pub signals: SignalSink,
    /// Frames and close requests from the supervisor.
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
}

/// Creates transports.
///
/// `connect` must not block: it starts the handshake in the background and
/// reports through `link.signals`. A transport must stop using `link` once
/// `outbound` is closed.
pub trait Connector: Send + Sync + 'static {
    /// Start a new connection using `config`.
    fn connect(&self, config: &SupervisorConfig, link: TransportLink);
}

/// Supervisor-owned handle to one transport instance.
///
/// Dropping the handle detaches it.
#[derive(Debug)]
pub struct TransportHandle {
    generation: u64,
    attached: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Outbound>,
    open: bool,
}

impl TransportHandle {
    /// Create a transport through `connector` and attach to its signals.
    pub(crate) fn spawn(
        connector: &dyn Connector,
        config: &SupervisorConfig,
        generation: u64,
        signals: SignalSender,
    ) -> Self {
        let attached = Arc::new(AtomicBool::new(true));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        connector.connect(
            config,
            TransportLink {
                signals: SignalSink {
                    generation,
                    attached: Arc::clone(&attached),
                    tx: signals,
                },
                outbound: outbound_rx,
            },
        );

        Self {
            generation,
            attached,
            outbound,
            open: false,
        }
    }

    /// Generation number of this transport.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the transport reported `Open`.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn mark_open(&mut self) {
        self.open = true;
    }

    /// Write a frame. Returns `false` if the transport is not open.
    pub fn send(&self, frame: String) -> bool {
        if !self.open || !self.attached.load(Ordering::SeqCst) {
            return false;
        }
        self.outbound.send(Outbound::Frame(frame)).is_ok()
    }

    /// Stop listening to this transport's signals.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    /// Detach and ask the transport to close.
    pub fn close(self) {
        self.detach();
        let _ = self.outbound.send(Outbound::Close);
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingConnector {
        links: Mutex<Vec<TransportLink>>,
    }

    impl Connector for CapturingConnector {
        fn connect(&self, _config: &SupervisorConfig, link: TransportLink) {
            self.links.lock().push(link);
        }
    }

    fn spawn_handle(
        connector: &CapturingConnector,
        generation: u64,
    ) -> (TransportHandle, mpsc::UnboundedReceiver<(u64, TransportSignal)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle =
            TransportHandle::spawn(connector, &SupervisorConfig::default(), generation, tx);
        (handle, rx)
    }

    #[test]
    fn test_signals_tagged_with_generation() {
        let connector = CapturingConnector::default();
        let (handle, mut rx) = spawn_handle(&connector, 3);
        let link = connector.links.lock().pop().expect("link");

        assert_eq!(handle.generation(), 3);
        assert_eq!(link.signals.generation(), 3);
        assert!(link.signals.emit(TransportSignal::Open));
        assert_eq!(rx.try_recv().expect("signal"), (3, TransportSignal::Open));
    }

    #[test]
    fn test_send_requires_open() {
        let connector = CapturingConnector::default();
        let (mut handle, _rx) = spawn_handle(&connector, 1);
        let mut link = connector.links.lock().pop().expect("link");

        assert!(!handle.send("early".to_string()));
        assert!(link.outbound.try_recv().is_err());

        handle.mark_open();
        assert!(handle.send("hello".to_string()));
        assert_eq!(
            link.outbound.try_recv().expect("frame"),
            Outbound::Frame("hello".to_string())
        );
    }

    #[test]
    fn test_detach_silences_sink() {
        let connector = CapturingConnector::default();
        let (handle, mut rx) = spawn_handle(&connector, 1);
        let link = connector.links.lock().pop().expect("link");

        handle.detach();

        assert!(!link.signals.is_attached());
        assert!(!link.signals.emit(TransportSignal::Open));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_close_requests_close_and_detaches() {
        let connector = CapturingConnector::default();
        let (handle, _rx) = spawn_handle(&connector, 1);
        let mut link = connector.links.lock().pop().expect("link");

        handle.close();

        assert!(!link.signals.is_attached());
        assert_eq!(link.outbound.try_recv().expect("close"), Outbound::Close);
    }

    #[test]
    fn test_drop_detaches() {
        let connector = CapturingConnector::default();
        let (handle, _rx) = spawn_handle(&connector, 1);
        let mut link = connector.links.lock().pop().expect("link");

        drop(handle);

        assert!(!link.signals.is_attached());
        assert!(matches!(
            link.outbound.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
