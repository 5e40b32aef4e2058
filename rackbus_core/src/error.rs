//! Unified error handling for rackbus.
//!
//! One crate-wide error enum covering every failure kind the bus can report.
//! Registry and publish surfaces stay boolean by contract; the enum is the
//! taxonomy for codec failures and dispatch diagnostics.

use thiserror::Error;

/// Main error type for rackbus operations.
#[derive(Debug, Error)]
pub enum RackbusError {
    /// Empty topic, missing handle, or empty payload.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Handle already registered or subscribed for the topic.
    #[error("duplicate registration: {0}")]
    Duplicate(String),

    /// Unregister/unsubscribe for a handle that was not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Publish attempted after broker shutdown was initiated.
    #[error("broker shutdown in progress")]
    ShutdownInProgress,

    /// Codec-level failure on encode or decode.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A subscriber callback panicked during delivery.
    #[error("subscriber fault on topic '{topic}': {message}")]
    SubscriberFault { topic: String, message: String },
}

/// Convenience type alias for Results using RackbusError.
pub type RackbusResult<T> = std::result::Result<T, RackbusError>;

/// Short alias — `Result<T>` is equivalent to `RackbusResult<T>`.
pub type Result<T> = RackbusResult<T>;

// ============================================
// From implementations for codec error types
// ============================================

impl From<rmp_serde::encode::Error> for RackbusError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        RackbusError::Serialization(format!("MessagePack encode error: {}", err))
    }
}

impl From<rmp_serde::decode::Error> for RackbusError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        RackbusError::Serialization(format!("MessagePack decode error: {}", err))
    }
}

impl From<serde_json::Error> for RackbusError {
    fn from(err: serde_json::Error) -> Self {
        RackbusError::Serialization(format!("JSON error: {}", err))
    }
}

// Helper methods
impl RackbusError {
    /// Create an invalid-argument error with a custom message.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        RackbusError::InvalidArgument(msg.into())
    }

    /// Create a serialization error with a custom message.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        RackbusError::Serialization(msg.into())
    }

    /// Create a subscriber-fault error from a caught panic payload.
    pub fn subscriber_fault<S: Into<String>, T: Into<String>>(topic: S, message: T) -> Self {
        RackbusError::SubscriberFault {
            topic: topic.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            RackbusError::invalid_argument("empty topic").to_string(),
            "invalid argument: empty topic"
        );
        assert_eq!(
            RackbusError::ShutdownInProgress.to_string(),
            "broker shutdown in progress"
        );
        assert_eq!(
            RackbusError::subscriber_fault("lfo/rate", "boom").to_string(),
            "subscriber fault on topic 'lfo/rate': boom"
        );
    }

    #[test]
    fn codec_errors_convert_to_serialization() {
        let err = serde_json::from_str::<i32>("not json").unwrap_err();
        let bus_err: RackbusError = err.into();
        assert!(matches!(bus_err, RackbusError::Serialization(_)));
    }
}
