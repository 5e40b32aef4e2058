//! Payload codecs: MessagePack (primary) and JSON (optional).
//!
//! Thin helpers over `rmp_serde` / `serde_json`, generic over serde types,
//! plus the message constructors modules actually call. Every failure
//! surfaces as [`RackbusError::Serialization`] — codec errors are never
//! silently dropped.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RackbusError, Result};
use crate::message::{format, Message};

/// Serialize a value to MessagePack bytes.
pub fn to_msgpack<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(value)?)
}

/// Deserialize a value from MessagePack bytes.
pub fn from_msgpack<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.is_empty() {
        return Err(RackbusError::serialization("empty MessagePack payload"));
    }
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Serialize a value to JSON bytes.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a value from JSON bytes.
pub fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.is_empty() {
        return Err(RackbusError::serialization("empty JSON payload"));
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Build a publishable message carrying `value` as MessagePack.
pub fn msgpack_message<T: Serialize>(
    topic: impl Into<String>,
    sender_id: i32,
    value: &T,
) -> Result<Arc<Message>> {
    let payload = to_msgpack(value)?;
    Ok(Arc::new(Message::new(
        topic,
        sender_id,
        format::MSGPACK,
        payload.into(),
    )))
}

/// Build a publishable message carrying `value` as JSON.
pub fn json_message<T: Serialize>(
    topic: impl Into<String>,
    sender_id: i32,
    value: &T,
) -> Result<Arc<Message>> {
    let payload = to_json(value)?;
    Ok(Arc::new(Message::new(
        topic,
        sender_id,
        format::JSON,
        payload.into(),
    )))
}

/// Decode a message payload according to its format tag.
pub fn decode<T: DeserializeOwned>(message: &Message) -> Result<T> {
    match message.format.as_str() {
        format::MSGPACK => from_msgpack(&message.payload),
        format::JSON => from_json(&message.payload),
        other => Err(RackbusError::Serialization(format!(
            "no codec registered for format '{}'",
            other
        ))),
    }
}
