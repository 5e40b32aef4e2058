//! # Rackbus Core
//!
//! The core runtime of rackbus, an in-process publish/subscribe context bus
//! for modular-synth rack modules. Modules register as providers of named
//! topics and/or subscribers to topics; the broker routes published messages
//! to every current subscriber with serialized payloads.
//!
//! Building blocks:
//!
//! - **Broker**: process-wide registry + dispatch worker ([`ContextBroker`])
//! - **Registry**: weak-handle topic indices with lazy purge ([`Registry`])
//! - **Ring**: lock-free SPSC hand-off to the audio thread ([`RingBuffer`])
//! - **Codecs**: MessagePack and JSON payload helpers ([`codec`])
//! - **Reference modules**: working provider/subscriber patterns
//!   ([`reference`])
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use rackbus_core::{codec, ContextBroker, ContextSubscriber, Message};
//!
//! struct Display;
//!
//! impl ContextSubscriber for Display {
//!     fn on_message(&self, message: &Message) {
//!         if let Ok(bpm) = codec::decode::<f32>(message) {
//!             let _ = bpm; // worker thread: hand off, don't block
//!         }
//!     }
//! }
//!
//! let broker = ContextBroker::new();
//! let display: Arc<dyn ContextSubscriber> = Arc::new(Display);
//! broker.subscribe("clock/bpm", &display);
//! broker.publish(codec::msgpack_message("clock/bpm", 1, &120.0f32).unwrap());
//! broker.shutdown();
//! ```
//!
//! Threading contract in one line: `publish` never blocks on delivery, the
//! single worker thread runs every `on_message`, and the audio thread only
//! ever touches a ring buffer `pop`.

pub mod broker;
pub mod codec;
pub mod config;
pub mod error;
pub mod host;
pub mod message;
pub mod module;
pub mod reference;
pub mod registry;
pub mod ring;
pub mod value;

// Re-export commonly used types for easy access
pub use broker::{context_broker, shutdown_context_broker, BrokerStats, ContextBroker, PROTOCOL_VERSION};
pub use config::{AdapterConfig, BrokerConfig};
pub use error::{RackbusError, RackbusResult};
pub use host::Rack;
pub use message::{format, Message, PRIORITY_NORMAL};
pub use module::{
    current_thread_role, set_thread_role, ContextProvider, ContextSubscriber, Module, ThreadRole,
};
pub use reference::{ReferenceProvider, ReferenceSubscriber};
pub use registry::Registry;
pub use ring::RingBuffer;
pub use value::{ContextValue, DecodedRecord};

// Re-export serde_json for consistent type usage across crates
pub use serde_json;
