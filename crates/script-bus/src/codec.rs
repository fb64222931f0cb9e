//! JSON frame codec for carrying messages across a process boundary.
//!
//! One message per frame. A frame whose `kind` is not known to this build
//! decodes to the `Unrecognized` variant so the receiving loop can log and
//! drop it instead of failing.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EventBusError;
use crate::message::{HostMessage, ScriptMessage};

/// A message type that can travel as a JSON frame.
pub trait Frame: Serialize + DeserializeOwned {
    /// Kinds this build understands
    fn known_kinds() -> &'static [&'static str];

    /// Placeholder for a frame of unknown kind
    fn unrecognized(kind: String) -> Self;
}

impl Frame for HostMessage {
    fn known_kinds() -> &'static [&'static str] {
        HostMessage::KINDS
    }

    fn unrecognized(kind: String) -> Self {
        HostMessage::Unrecognized(kind)
    }
}

impl Frame for ScriptMessage {
    fn known_kinds() -> &'static [&'static str] {
        ScriptMessage::KINDS
    }

    fn unrecognized(kind: String) -> Self {
        ScriptMessage::Unrecognized(kind)
    }
}

/// Encodes a message as a single-line JSON frame.
pub fn encode<T: Frame>(message: &T) -> Result<String, EventBusError> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes one JSON frame.
pub fn decode<T: Frame>(frame: &str) -> Result<T, EventBusError> {
    let value: serde_json::Value = serde_json::from_str(frame)?;
    let kind = value
        .get("kind")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EventBusError::Codec("frame has no `kind` field".into()))?
        .to_string();

    if !T::known_kinds().contains(&kind.as_str()) {
        return Ok(T::unrecognized(kind));
    }

    Ok(serde_json::from_value(value)?)
}
