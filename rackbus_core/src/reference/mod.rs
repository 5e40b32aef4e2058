//! Reference modules: the patterns a well-behaved provider and subscriber
//! follow.
//!
//! These are working modules, not toys — hosts can drop them into a rack to
//! smoke-test the bus, and module authors can copy their structure: register
//! and subscribe in `on_add`/`on_remove`, decode on the worker thread, hand
//! records across an SPSC ring, and drain a bounded number per audio block.

pub mod provider;
pub mod subscriber;

pub use provider::ReferenceProvider;
pub use subscriber::ReferenceSubscriber;

/// Topics the reference pair exchanges.
pub mod topics {
    /// Main amplitude parameter (float).
    pub const PARAMETER_1: &str = "reference/parameter1";
    /// Modulation amount parameter (float).
    pub const PARAMETER_2: &str = "reference/parameter2";
    /// Current preset name (string).
    pub const PRESET: &str = "reference/preset";
    /// Parameter bank (float array).
    pub const PARAMETERS: &str = "reference/parameters";
}
