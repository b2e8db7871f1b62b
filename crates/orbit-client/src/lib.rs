//! # orbit-client
//!
//! Client for the Orbit B-hyve irrigation service.
//!
//! - [`SessionClient`] - REST login and device listing
//! - [`Client`] - authenticates, then starts the supervised event stream
//! - [`ClientConfig`] - JSON configuration with service defaults
//!
//! The live stream itself comes from [`orbit_stream`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod session;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigUpdate, ReconnectConfig};
pub use error::OrbitError;
pub use session::{Device, Session, SessionClient};

pub use orbit_stream::{ConnectionState, StreamEvent, SupervisorHandle};
