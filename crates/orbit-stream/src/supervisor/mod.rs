//! Connection supervisor.
//!
//! Owns the single logical event stream: creates and replaces transports,
//! runs the reconnect backoff and the heartbeat, and fans events out to
//! subscribers.
//!
//! The supervisor runs as one tokio task. Every input (a handle command, a
//! transport signal, a timer expiry) is handled to completion before the next
//! one is looked at, so no state is shared with other tasks except the
//! read-only status snapshot behind [`SupervisorHandle`].

mod backoff;
mod events;
mod heartbeat;
mod state;
mod transport;
mod websocket;

#[cfg(test)]
mod mock;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Sleep, sleep};
use tracing::{debug, info, trace, warn};

use crate::config::SupervisorConfig;
use crate::error::StreamError;
use crate::frame::{self, Frame};

pub use backoff::{BackoffPolicy, ReconnectState};
pub use events::StreamEvent;
pub use heartbeat::{HeartbeatTimer, MAX_HEARTBEAT_PERIOD, MIN_HEARTBEAT_PERIOD};
pub use state::{AtomicConnectionState, ConnectionState};
pub use transport::{
    Connector, Outbound, SignalSink, TransportHandle, TransportLink, TransportSignal,
};
pub use websocket::{ABNORMAL_CLOSURE, NO_STATUS_RECEIVED, WebSocketConnector};

use state::SharedStatus;
use transport::SignalSender;

enum Command {
    Connect,
    Send(Result<String, StreamError>),
    Close,
    Subscribe(mpsc::UnboundedSender<StreamEvent>),
    UpdateConfig(SupervisorConfig),
    SetSessionToken(String),
    Shutdown,
}

/// Reconnect timer; exists only while the supervisor is `Reconnecting`.
struct PendingReconnect {
    sleep: Pin<Box<Sleep>>,
    delay: Duration,
}

/// The connection supervisor. Build one, then [`spawn`](Self::spawn) it.
pub struct ConnectionSupervisor {
    config: SupervisorConfig,
    connector: Arc<dyn Connector>,
    session_token: Option<String>,
    state: ConnectionState,
    reconnect: ReconnectState,
    transport: Option<TransportHandle>,
    heartbeat: Option<HeartbeatTimer>,
    pending_reconnect: Option<PendingReconnect>,
    generation: u64,
    listeners: Vec<mpsc::UnboundedSender<StreamEvent>>,
    signals_tx: SignalSender,
    signals_rx: mpsc::UnboundedReceiver<(u64, TransportSignal)>,
    status: Arc<SharedStatus>,
}

impl ConnectionSupervisor {
    /// Create a supervisor that opens transports through `connector`.
    #[must_use]
    pub fn new(config: SupervisorConfig, connector: impl Connector) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let reconnect = ReconnectState::new(config.base_delay());
        Self {
            config,
            connector: Arc::new(connector),
            session_token: None,
            state: ConnectionState::Disconnected,
            reconnect,
            transport: None,
            heartbeat: None,
            pending_reconnect: None,
            generation: 0,
            listeners: Vec::new(),
            signals_tx,
            signals_rx,
            status: Arc::new(SharedStatus::new()),
        }
    }

    /// Supervisor using the WebSocket transport.
    #[must_use]
    pub fn websocket(config: SupervisorConfig) -> Self {
        Self::new(config, WebSocketConnector)
    }

    /// Send the `app_connection` handshake with `token` whenever a transport opens.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Start the supervisor loop on the current tokio runtime.
    ///
    /// The supervisor starts `Disconnected`; call
    /// [`SupervisorHandle::connect`] to open the stream.
    pub fn spawn(self) -> SupervisorHandle {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let status = Arc::clone(&self.status);
        tokio::spawn(self.run(commands_rx));
        SupervisorHandle { commands, status }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!(url = %self.config.url, "supervisor started");

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else {
                        self.close();
                        break;
                    };
                    if !self.handle_command(command) {
                        break;
                    }
                }

                Some((generation, signal)) = self.signals_rx.recv() => {
                    self.handle_signal(generation, signal);
                }

                generation = next_heartbeat(&mut self.heartbeat) => {
                    self.on_heartbeat(generation);
                }

                () = reconnect_due(&mut self.pending_reconnect) => {
                    self.on_reconnect_due();
                }
            }

            self.publish();
        }

        self.publish();
        debug!("supervisor stopped");
    }

    /// Returns `false` once the loop should stop.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Connect => self.connect(),
            Command::Send(Ok(text)) => self.send_frame(text),
            Command::Send(Err(error)) => {
                warn!(error = %error, "dropping message that failed to encode");
                self.emit(StreamEvent::Error(error));
            }
            Command::Close => self.close(),
            Command::Subscribe(listener) => self.listeners.push(listener),
            Command::UpdateConfig(config) => self.update_config(config),
            Command::SetSessionToken(token) => self.session_token = Some(token),
            Command::Shutdown => {
                self.close();
                return false;
            }
        }
        true
    }

    fn update_config(&mut self, config: SupervisorConfig) {
        if let Err(error) = config.validate() {
            warn!(error = %error, url = %config.url, "rejecting configuration, keeping current one");
            self.emit(StreamEvent::Error(error));
            return;
        }
        debug!(url = %config.url, "configuration replaced");
        self.config = config;
    }

    fn connect(&mut self) {
        match self.state {
            ConnectionState::Connecting
            | ConnectionState::Open
            | ConnectionState::Reconnecting => {
                debug!(state = %self.state, "connect ignored, stream already active");
            }
            ConnectionState::Disconnected
            | ConnectionState::FailedPermanently
            | ConnectionState::Closing => {
                if let Err(error) = self.config.validate() {
                    warn!(error = %error, "refusing to connect with invalid configuration");
                    self.emit(StreamEvent::Error(error));
                    return;
                }
                self.reconnect.arm(self.config.base_delay());
                self.open_transport();
            }
        }
    }

    fn open_transport(&mut self) {
        // Old listeners go before new ones attach.
        self.detach_transport();

        self.generation += 1;
        info!(
            url = %self.config.url,
            generation = self.generation,
            attempt = self.reconnect.attempts,
            "connecting to event stream"
        );
        let handle = TransportHandle::spawn(
            self.connector.as_ref(),
            &self.config,
            self.generation,
            self.signals_tx.clone(),
        );
        self.transport = Some(handle);
        self.state = ConnectionState::Connecting;
    }

    fn detach_transport(&mut self) {
        if let Some(transport) = self.transport.take() {
            trace!(generation = transport.generation(), "detaching transport");
            transport.close();
        }
    }

    fn handle_signal(&mut self, generation: u64, signal: TransportSignal) {
        let current = self.transport.as_ref().map(TransportHandle::generation);
        if current != Some(generation) {
            trace!(generation, "ignoring signal from detached transport");
            return;
        }

        match signal {
            TransportSignal::Open => self.on_open(),
            TransportSignal::Message(text) => self.on_message(&text),
            TransportSignal::Error(error) if error.is_transport() => {
                warn!(generation, error = %error, "event stream error");
                self.emit(StreamEvent::Error(error));
                self.on_failure();
            }
            TransportSignal::Error(error) => {
                warn!(generation, error = %error, "frame rejected, connection kept");
                self.emit(StreamEvent::Error(error));
            }
            TransportSignal::Close { code, reason } => {
                info!(generation, code, reason = %reason, "event stream closed");
                self.emit(StreamEvent::Close { code, reason });
                self.on_failure();
            }
        }
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        transport.mark_open();
        let generation = transport.generation();

        self.state = ConnectionState::Open;
        self.reconnect.reset(self.config.base_delay());
        let heartbeat = HeartbeatTimer::start(self.config.heartbeat_interval(), generation);
        info!(
            generation,
            heartbeat_ms = u64::try_from(heartbeat.period().as_millis()).unwrap_or(u64::MAX),
            "event stream open"
        );
        self.heartbeat = Some(heartbeat);

        if let Some(token) = self.session_token.clone() {
            match Frame::app_connection(token).to_text() {
                Ok(text) => self.send_frame(text),
                Err(error) => self.emit(StreamEvent::Error(error)),
            }
        }

        self.emit(StreamEvent::Open);
    }

    fn on_message(&mut self, text: &str) {
        match frame::decode(text) {
            Ok(value) => self.emit(StreamEvent::Message(value)),
            Err(error) => {
                warn!(error = %error, "failed to decode stream frame");
                self.emit(StreamEvent::Error(error));
            }
        }
    }

    fn on_failure(&mut self) {
        if !self.state.has_transport() {
            return;
        }

        self.heartbeat = None;
        self.detach_transport();

        if !self.reconnect.should_reconnect {
            self.state = ConnectionState::Disconnected;
            return;
        }

        if !self.reconnect.can_retry(self.config.max_attempts) {
            self.reconnect.disarm();
            self.state = ConnectionState::FailedPermanently;
            warn!(
                attempts = self.reconnect.attempts,
                "max reconnect attempts reached, giving up"
            );
            self.emit(StreamEvent::MaxReconnectAttemptsReached);
            return;
        }

        let delay = self.config.backoff().next_delay(self.reconnect.attempts);
        self.reconnect.current_delay = delay;
        let attempt = self.reconnect.attempts + 1;
        info!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );
        self.emit(StreamEvent::ReconnectAttempt { attempt, delay });

        self.pending_reconnect = Some(PendingReconnect {
            sleep: Box::pin(sleep(delay)),
            delay,
        });
        self.state = ConnectionState::Reconnecting;
    }

    fn on_reconnect_due(&mut self) {
        let Some(pending) = self.pending_reconnect.take() else {
            return;
        };
        // close() may have run since the timer was armed.
        if self.state != ConnectionState::Reconnecting || !self.reconnect.should_reconnect {
            debug!("stale reconnect timer ignored");
            return;
        }

        self.reconnect.attempts += 1;
        debug!(
            attempt = self.reconnect.attempts,
            waited_ms = u64::try_from(pending.delay.as_millis()).unwrap_or(u64::MAX),
            "reconnect timer fired"
        );
        self.open_transport();
    }

    fn on_heartbeat(&mut self, generation: u64) {
        let live = self.state == ConnectionState::Open
            && self
                .transport
                .as_ref()
                .is_some_and(|t| t.generation() == generation && t.is_open());
        if !live {
            trace!(generation, "heartbeat skipped, transport not open");
            return;
        }

        match Frame::ping().to_text() {
            Ok(text) => {
                trace!(generation, "sending heartbeat");
                self.send_frame(text);
            }
            Err(error) => self.emit(StreamEvent::Error(error)),
        }
    }

    fn send_frame(&mut self, text: String) {
        if self.state != ConnectionState::Open {
            debug!(state = %self.state, "dropping frame, stream not open");
            return;
        }
        if let Some(transport) = self.transport.as_ref() {
            if !transport.send(text) {
                debug!("dropping frame, transport not writable");
            }
        }
    }

    fn close(&mut self) {
        self.reconnect.disarm();
        if self.state == ConnectionState::Disconnected && self.transport.is_none() {
            return;
        }

        self.state = ConnectionState::Closing;
        self.publish();

        self.pending_reconnect = None;
        self.heartbeat = None;
        self.detach_transport();

        self.state = ConnectionState::Disconnected;
        info!("event stream closed by client");
    }

    fn emit(&mut self, event: StreamEvent) {
        self.publish();
        trace!(event = event.name(), listeners = self.listeners.len(), "emitting");
        self.listeners
            .retain(|listener| listener.send(event.clone()).is_ok());
    }

    fn publish(&self) {
        self.status.publish(self.state, &self.reconnect);
    }
}

async fn next_heartbeat(timer: &mut Option<HeartbeatTimer>) -> u64 {
    match timer {
        Some(timer) => {
            timer.tick().await;
            timer.generation()
        }
        None => std::future::pending().await,
    }
}

async fn reconnect_due(pending: &mut Option<PendingReconnect>) {
    match pending {
        Some(pending) => pending.sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Handle to a running [`ConnectionSupervisor`].
///
/// Every operation is fire-and-forget: it queues a command for the
/// supervisor loop and returns immediately. Nothing here returns an error;
/// failures show up as [`StreamEvent`]s.
#[derive(Clone)]
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<SharedStatus>,
}

impl SupervisorHandle {
    /// Open the stream. No-op while a connection or retry is already in progress.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Encode `message` and write it if the stream is open; otherwise drop it.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) {
        self.command(Command::Send(frame::encode(message)));
    }

    /// Close the stream and disable reconnection. Safe to call in any state.
    pub fn close(&self) {
        self.command(Command::Close);
    }

    /// Subscribe to stream events from this point on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.command(Command::Subscribe(tx));
        rx
    }

    /// Replace the configuration used for the next transport.
    pub fn update_config(&self, config: SupervisorConfig) {
        self.command(Command::UpdateConfig(config));
    }

    /// Set the token presented in the `app_connection` handshake.
    pub fn set_session_token(&self, token: impl Into<String>) {
        self.command(Command::SetSessionToken(token.into()));
    }

    /// Close the stream and stop the supervisor task.
    pub fn shutdown(&self) {
        self.command(Command::Shutdown);
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.state()
    }

    /// Reconnect attempts made since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.status.attempts()
    }

    /// Whether failures currently trigger automatic recovery.
    #[must_use]
    pub fn should_reconnect(&self) -> bool {
        self.status.should_reconnect()
    }

    /// Whether the supervisor task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn command(&self, command: Command) {
        // A stopped supervisor has nothing left to act on.
        let _ = self.commands.send(command);
    }
}

impl std::fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("state", &self.state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .field("should_reconnect", &self.should_reconnect())
            .finish()
    }
}
