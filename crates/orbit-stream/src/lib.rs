//! # orbit-stream
//!
//! Supervised real-time event stream for the Orbit B-hyve irrigation service.
//!
//! The B-hyve cloud pushes device notifications (watering started, station
//! progress, rain delays) over a long-lived WebSocket. This crate keeps one
//! logical connection alive on top of short-lived transports:
//!
//! - [`ConnectionSupervisor`] - owns the connection state machine
//! - [`BackoffPolicy`] - exponential reconnect delays with a cap
//! - [`HeartbeatTimer`] - periodic `ping` frames while open
//! - [`TransportHandle`] - one underlying connection, replaced on reconnect
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use orbit_stream::{ConnectionSupervisor, StreamEvent, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SupervisorConfig::new("wss://api.orbitbhyve.com/v1/events");
//!     let handle = ConnectionSupervisor::websocket(config)
//!         .with_session_token("orbit-session-token")
//!         .spawn();
//!
//!     let mut events = handle.subscribe();
//!     handle.connect();
//!
//!     while let Some(event) = events.recv().await {
//!         if let StreamEvent::Message(value) = event {
//!             println!("{value}");
//!         }
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod frame;
pub mod supervisor;

pub use config::{SupervisorConfig, TransportOptions};
pub use error::StreamError;
pub use frame::Frame;
pub use supervisor::{
    BackoffPolicy, ConnectionState, ConnectionSupervisor, Connector, HeartbeatTimer,
    ReconnectState, StreamEvent, SupervisorHandle, TransportHandle, TransportLink,
    TransportSignal, WebSocketConnector,
};
