//! # Rackbus
//!
//! In-process publish/subscribe context bus for modular-synth rack modules.
//!
//! Providers register the topics they offer, subscribers register interest,
//! and the broker fans published messages out asynchronously — without the
//! publisher ever blocking on delivery and without the audio thread ever
//! touching a lock.
//!
//! ## Quick start
//!
//! ```rust
//! use rackbus::prelude::*;
//! use std::time::Duration;
//!
//! let broker = Arc::new(ContextBroker::new());
//!
//! let provider = ReferenceProvider::new(1);
//! let listener = ReferenceSubscriber::new(2);
//! provider.clone().on_add(&broker);
//! listener.clone().on_add(&broker);
//!
//! provider.publish_value(&broker, "reference/parameter1", &0.9f32);
//! while listener.messages_received() < 1 {
//!     std::thread::sleep(Duration::from_millis(2));
//! }
//!
//! let mut block = [0.0f32; 64];
//! listener.process(&mut block, 64);
//! assert_eq!(listener.parameter(1), 0.9);
//!
//! listener.clone().on_remove(&broker);
//! provider.clone().on_remove(&broker);
//! broker.shutdown();
//! ```

// Re-export core components
pub use rackbus_core::{self, *};

// Re-export serde for modules deriving their own payload types
pub use serde;

/// The rackbus prelude — everything a module needs to get started.
pub mod prelude {
    // Broker and process-wide instance
    pub use rackbus_core::broker::{
        context_broker, shutdown_context_broker, BrokerStats, ContextBroker, PROTOCOL_VERSION,
    };

    // Module capabilities and lifecycle
    pub use rackbus_core::module::{
        current_thread_role, set_thread_role, ContextProvider, ContextSubscriber, Module,
        ThreadRole,
    };

    // Messages and codecs
    pub use rackbus_core::codec::{decode, json_message, msgpack_message};
    pub use rackbus_core::message::{format, Message, PRIORITY_NORMAL};
    pub use rackbus_core::value::{ContextValue, DecodedRecord};

    // Audio-thread hand-off
    pub use rackbus_core::ring::RingBuffer;

    // Configuration
    pub use rackbus_core::config::{AdapterConfig, BrokerConfig};

    // Reference modules and the demo host
    pub use rackbus_core::host::Rack;
    pub use rackbus_core::reference::{ReferenceProvider, ReferenceSubscriber};

    // Error types
    pub use rackbus_core::error::{RackbusError, RackbusResult};

    // Common std types
    pub use std::sync::Arc;

    // Common traits
    pub use serde::{Deserialize, Serialize};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the rackbus crate version.
pub fn version() -> &'static str {
    VERSION
}
