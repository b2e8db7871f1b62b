//! Client facade tying the REST session to the event stream.

use orbit_stream::{ConnectionSupervisor, SupervisorHandle};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::OrbitError;
use crate::session::{Device, Session, SessionClient};

/// Orbit B-hyve client.
///
/// Typical use is [`authenticate`](Self::authenticate), then
/// [`devices`](Self::devices) and [`connect_stream`](Self::connect_stream).
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    rest: SessionClient,
    session: Option<Session>,
    device_id: Option<String>,
}

impl Client {
    /// Create a client. The configuration is validated up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ClientConfig) -> Result<Self, OrbitError> {
        config.validate()?;
        let rest = SessionClient::new(&config)?;
        Ok(Self {
            config,
            rest,
            session: None,
            device_id: None,
        })
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session obtained by the last successful [`authenticate`](Self::authenticate).
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// First device id seen by [`devices`](Self::devices).
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Log in with the configured email and password.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::Config`] if credentials are missing, or the
    /// login error from the service.
    pub async fn authenticate(&mut self) -> Result<&Session, OrbitError> {
        let (email, password) = self
            .config
            .credentials()
            .ok_or_else(|| OrbitError::Config("email and password are required".to_string()))?;

        let session = self.rest.login(email, password).await?;
        info!(user_id = %session.user_id, "authenticated");
        Ok(self.session.insert(session))
    }

    /// List the account's devices and remember the first one.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::NotAuthenticated`] before a session exists,
    /// [`OrbitError::NoDevices`] for an empty account, or the request error.
    pub async fn devices(&mut self) -> Result<Vec<Device>, OrbitError> {
        let session = self.session.as_ref().ok_or(OrbitError::NotAuthenticated)?;
        let devices = self.rest.devices(session).await?;

        let first = devices.first().ok_or_else(|| OrbitError::NoDevices {
            user_id: session.user_id.clone(),
        })?;
        debug!(device_id = %first.id, "primary device");
        self.device_id = Some(first.id.clone());

        Ok(devices)
    }

    /// Start the event stream for the current session.
    ///
    /// The returned handle is already connecting; subscribe to it for events.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::NotAuthenticated`] before a session exists.
    pub fn connect_stream(&self) -> Result<SupervisorHandle, OrbitError> {
        let session = self.session.as_ref().ok_or(OrbitError::NotAuthenticated)?;

        let handle = ConnectionSupervisor::websocket(self.config.stream_config())
            .with_session_token(session.orbit_session_token.clone())
            .spawn();
        handle.connect();
        info!(url = %self.config.wss_url, "event stream started");

        Ok(handle)
    }
}
