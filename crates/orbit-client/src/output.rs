//! Line-oriented JSON output for the CLI.

use std::io::Write;

use serde_json::{Value, json};

use orbit_stream::StreamEvent;

use crate::error::OrbitError;
use crate::session::Device;

/// JSON form of a stream event.
#[must_use]
pub fn event_json(event: &StreamEvent) -> Value {
    let name = event.name();
    match event {
        StreamEvent::Open | StreamEvent::MaxReconnectAttemptsReached => json!({ "event": name }),
        StreamEvent::Message(data) => json!({ "event": name, "data": data }),
        StreamEvent::Error(error) => json!({ "event": name, "message": error.to_string() }),
        StreamEvent::Close { code, reason } => {
            json!({ "event": name, "code": code, "reason": reason })
        }
        StreamEvent::ReconnectAttempt { attempt, delay } => json!({
            "event": name,
            "attempt": attempt,
            "delay_ms": u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Write one event as a single JSON line.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_event<W: Write>(writer: &mut W, event: &StreamEvent) -> Result<(), OrbitError> {
    serde_json::to_writer(&mut *writer, &event_json(event))?;
    writeln!(writer)?;
    Ok(())
}

/// Write the device list as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_devices<W: Write>(writer: &mut W, devices: &[Device]) -> Result<(), OrbitError> {
    serde_json::to_writer_pretty(&mut *writer, devices)?;
    writeln!(writer)?;
    Ok(())
}
