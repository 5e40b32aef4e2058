//! The message value passed through the bus.
//!
//! A message is constructed once (typically by a codec helper, see
//! [`crate::codec`]) and never mutated. The payload is a shared immutable
//! byte buffer: one allocation serves the worker FIFO and every subscriber
//! callback in the fan-out.

use std::sync::Arc;
use std::time::Instant;

/// Media-type tags for message payloads.
pub mod format {
    /// MessagePack format identifier (primary codec).
    pub const MSGPACK: &str = "application/msgpack";

    /// JSON format identifier (optional codec).
    pub const JSON: &str = "application/json";

    /// Raw binary data format identifier. No codec pair is registered for
    /// this tag; it is available for callers shipping opaque bytes.
    pub const BINARY: &str = "application/octet-stream";
}

/// Default message priority. Higher values are meant to be delivered sooner;
/// the reference dispatcher records priority but delivers in FIFO order.
pub const PRIORITY_NORMAL: u8 = 5;

/// An immutable message routed from one publishing module to every current
/// subscriber of its topic.
#[derive(Debug, Clone)]
pub struct Message {
    /// Topic this message belongs to. Must be non-empty to publish.
    pub topic: String,
    /// Id of the publishing module.
    pub sender_id: i32,
    /// Media-type tag describing the payload encoding (see [`format`]).
    pub format: String,
    /// Serialized payload, shared across the whole fan-out. Must be
    /// non-empty to publish.
    pub payload: Arc<[u8]>,
    /// Optional 64-bit message identifier; 0 means unset.
    pub message_id: u64,
    /// Delivery priority, higher = sooner. Advisory; see [`PRIORITY_NORMAL`].
    pub priority: u8,
    /// Monotonic creation time.
    pub timestamp: Instant,
}

impl Message {
    /// Create a message with default id (unset) and priority (normal).
    pub fn new(
        topic: impl Into<String>,
        sender_id: i32,
        format: impl Into<String>,
        payload: Arc<[u8]>,
    ) -> Self {
        Self {
            topic: topic.into(),
            sender_id,
            format: format.into(),
            payload,
            message_id: 0,
            priority: PRIORITY_NORMAL,
            timestamp: Instant::now(),
        }
    }

    /// Set the message identifier.
    pub fn with_message_id(mut self, id: u64) -> Self {
        self.message_id = id;
        self
    }

    /// Set the delivery priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Payload size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// A message is publishable when its topic and payload are both
    /// non-empty.
    pub fn is_valid(&self) -> bool {
        !self.topic.is_empty() && !self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(bytes: &[u8]) -> Arc<[u8]> {
        Arc::from(bytes.to_vec().into_boxed_slice())
    }

    #[test]
    fn defaults() {
        let msg = Message::new("osc/freq", 3, format::MSGPACK, payload(b"\x01"));
        assert_eq!(msg.message_id, 0);
        assert_eq!(msg.priority, PRIORITY_NORMAL);
        assert_eq!(msg.size(), 1);
        assert!(msg.is_valid());
    }

    #[test]
    fn builders() {
        let msg = Message::new("osc/freq", 3, format::JSON, payload(b"{}"))
            .with_message_id(42)
            .with_priority(9);
        assert_eq!(msg.message_id, 42);
        assert_eq!(msg.priority, 9);
    }

    #[test]
    fn empty_topic_or_payload_is_invalid() {
        let empty_topic = Message::new("", 1, format::MSGPACK, payload(b"x"));
        assert!(!empty_topic.is_valid());

        let empty_payload = Message::new("t", 1, format::MSGPACK, payload(b""));
        assert!(!empty_payload.is_valid());
    }

    #[test]
    fn payload_is_shared_not_copied() {
        let bytes = payload(b"shared");
        let a = Message::new("t", 1, format::BINARY, bytes.clone());
        let b = a.clone();
        // Cloning the message clones the Arc, not the bytes.
        assert_eq!(Arc::strong_count(&bytes), 3);
        assert!(Arc::ptr_eq(&a.payload, &b.payload));
    }
}
