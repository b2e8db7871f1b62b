//! Connection state types.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::backoff::ReconnectState;

/// State of the event stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport and no pending retry.
    Disconnected,
    /// A transport exists and is performing its opening handshake.
    Connecting,
    /// The transport is open; heartbeats are running.
    Open,
    /// The transport failed; a reconnect timer is pending.
    Reconnecting,
    /// Explicit close in progress.
    Closing,
    /// Reconnect attempts exhausted. Only `connect()` leaves this state.
    FailedPermanently,
}

impl ConnectionState {
    /// Whether a transport currently exists for this state.
    #[must_use]
    pub const fn has_transport(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
            Self::Closing => "closing",
            Self::FailedPermanently => "failed_permanently",
        };
        f.write_str(name)
    }
}

/// Atomic wrapper for connection state.
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU32);

impl AtomicConnectionState {
    /// Create a new atomic state.
    #[must_use]
    pub const fn new(state: ConnectionState) -> Self {
        Self(AtomicU32::new(state as u32))
    }

    /// Load the current state.
    #[must_use]
    pub fn load(&self) -> ConnectionState {
        match self.0.load(Ordering::SeqCst) {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::Closing,
            _ => ConnectionState::FailedPermanently,
        }
    }

    /// Store a new state.
    pub fn store(&self, state: ConnectionState) {
        self.0.store(state as u32, Ordering::SeqCst);
    }
}

/// Snapshot of supervisor state published for handles to read.
///
/// Only the supervisor loop writes it.
#[derive(Debug)]
pub(crate) struct SharedStatus {
    state: AtomicConnectionState,
    attempts: AtomicU32,
    should_reconnect: AtomicBool,
}

impl SharedStatus {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicConnectionState::new(ConnectionState::Disconnected),
            attempts: AtomicU32::new(0),
            should_reconnect: AtomicBool::new(false),
        }
    }

    pub(crate) fn publish(&self, state: ConnectionState, reconnect: &ReconnectState) {
        self.attempts.store(reconnect.attempts, Ordering::SeqCst);
        self.should_reconnect
            .store(reconnect.should_reconnect, Ordering::SeqCst);
        self.state.store(state);
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state.load()
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn should_reconnect(&self) -> bool {
        self.should_reconnect.load(Ordering::SeqCst)
    }
}
