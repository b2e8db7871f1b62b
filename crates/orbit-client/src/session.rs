//! REST session and device listing.

use reqwest::{Client as HttpClient, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::OrbitError;

/// Header carrying the session token on authenticated requests.
pub const SESSION_TOKEN_HEADER: &str = "orbit-session-token";

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Token presented on REST calls and in the stream handshake.
    pub orbit_session_token: String,
    /// Account the token belongs to.
    pub user_id: String,
}

/// A device registered to the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device id, used to address stream commands.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Device type, e.g. `sprinkler_timer`.
    #[serde(rename = "type", default)]
    pub device_type: String,
    /// Raw status object as reported by the service.
    #[serde(default)]
    pub status: Value,
    /// Every other field, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Client for the session and device endpoints.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: HttpClient,
    base_url: String,
}

impl SessionClient {
    /// Create a client for `config.base_url` using `config.timeout_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, OrbitError> {
        let http = HttpClient::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Log in and obtain a session token.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::Api`] if the service rejects the credentials.
    #[instrument(skip_all, fields(base_url = %self.base_url))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, OrbitError> {
        let body = json!({
            "session": {
                "email": email,
                "password": password,
            }
        });

        let response = self
            .http
            .post(format!("{}/v1/session", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, "failed to connect to Orbit API").await?;

        let value: Value = response.json().await?;
        debug!(user_id = ?value.get("user_id"), "session created");
        session_from_value(value)
    }

    /// List the devices of the session's account.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::Api`] on a non-success response.
    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn devices(&self, session: &Session) -> Result<Vec<Device>, OrbitError> {
        let response = self
            .http
            .get(format!("{}/v1/devices", self.base_url))
            .query(&[("user_id", session.user_id.as_str())])
            .header(SESSION_TOKEN_HEADER, &session.orbit_session_token)
            .send()
            .await?;
        let response = check_status(response, "failed to list devices").await?;

        let devices: Vec<Device> = response.json().await?;
        debug!(count = devices.len(), "devices listed");
        Ok(devices)
    }
}

/// Turn a non-success response into [`OrbitError::Api`].
async fn check_status(response: Response, message: &str) -> Result<Response, OrbitError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text)
        .ok()
        .or_else(|| (!text.is_empty()).then(|| Value::String(text)));
    debug!(status = status.as_u16(), body = ?body, "request failed");
    Err(OrbitError::api(message, Some(status.as_u16()), body))
}

/// The service returns `user_id` as a string, older accounts as a number.
fn session_from_value(value: Value) -> Result<Session, OrbitError> {
    let token = value
        .get("orbit_session_token")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            OrbitError::api("session response missing token", None, Some(value.clone()))
        })?;
    let user_id = match value.get("user_id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(OrbitError::api(
                "session response missing user_id",
                None,
                Some(value.clone()),
            ));
        }
    };

    Ok(Session {
        orbit_session_token: token.to_string(),
        user_id,
    })
}
