//! Decoded payload values handed from the worker thread to the audio thread.
//!
//! [`ContextValue`] covers the value types the bus codecs support. Cloning is
//! cheap: scalars copy, text shares nothing worth pooling at these sizes, and
//! arrays live behind shared immutable buffers so a push/pop through the ring
//! never copies the elements.

use std::sync::Arc;

/// A decoded message payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// A single-precision float (parameter values, levels, rates).
    Float(f32),
    /// A signed integer (counters, indices, switch positions).
    Int(i64),
    /// A text value (preset names, labels).
    Text(String),
    /// An immutable float array (parameter banks, envelopes).
    FloatArray(Arc<[f32]>),
    /// An immutable string array (preset lists, port labels).
    TextArray(Arc<[String]>),
}

impl ContextValue {
    pub fn is_float(&self) -> bool {
        matches!(self, ContextValue::Float(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, ContextValue::Int(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContextValue::Text(_))
    }

    pub fn is_float_array(&self) -> bool {
        matches!(self, ContextValue::FloatArray(_))
    }

    pub fn is_text_array(&self) -> bool {
        matches!(self, ContextValue::TextArray(_))
    }

    /// The float value, if this variant holds one.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            ContextValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer value, if this variant holds one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ContextValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The text value, if this variant holds one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContextValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The float array, if this variant holds one.
    pub fn as_float_array(&self) -> Option<&[f32]> {
        match self {
            ContextValue::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    /// The string array, if this variant holds one.
    pub fn as_text_array(&self) -> Option<&[String]> {
        match self {
            ContextValue::TextArray(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f32> for ContextValue {
    fn from(v: f32) -> Self {
        ContextValue::Float(v)
    }
}

impl From<i64> for ContextValue {
    fn from(v: i64) -> Self {
        ContextValue::Int(v)
    }
}

impl From<String> for ContextValue {
    fn from(v: String) -> Self {
        ContextValue::Text(v)
    }
}

impl From<Vec<f32>> for ContextValue {
    fn from(v: Vec<f32>) -> Self {
        ContextValue::FloatArray(v.into())
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(v: Vec<String>) -> Self {
        ContextValue::TextArray(v.into())
    }
}

/// A decoded message as queued for the audio thread: the topic it arrived on
/// plus its decoded value.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub topic: Arc<str>,
    pub value: ContextValue,
}

impl DecodedRecord {
    pub fn new(topic: impl Into<Arc<str>>, value: impl Into<ContextValue>) -> Self {
        Self {
            topic: topic.into(),
            value: value.into(),
        }
    }
}
