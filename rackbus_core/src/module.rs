//! Host-framework seam: the capabilities the bus consumes from modules and
//! the lifecycle discipline modules follow.
//!
//! Providers and subscribers are pure capability sets — one method each.
//! Modules compose them; nothing inherits. Registration and subscription
//! happen in [`Module::on_add`] / [`Module::on_remove`], never in
//! constructors or `Drop`: the broker stores weak handles, and obtaining a
//! shared handle to `self` while the last strong reference is being dropped
//! is exactly the trap the lifecycle callbacks exist to avoid.

use std::cell::Cell;
use std::sync::Arc;

use crate::broker::ContextBroker;
use crate::message::Message;

/// Capability of a module that offers topics on the bus.
pub trait ContextProvider: Send + Sync {
    /// The topics this module is willing to publish on.
    fn provided_topics(&self) -> Vec<String>;
}

/// Capability of a module that receives messages from the bus.
pub trait ContextSubscriber: Send + Sync {
    /// Called by the broker worker thread for every message published on a
    /// subscribed topic.
    ///
    /// Runs on the worker thread, never the audio thread. Must not block;
    /// decode the payload and hand it across a ring buffer instead.
    fn on_message(&self, message: &Message);
}

/// Lifecycle and audio entry points of a rack module.
pub trait Module: Send + Sync {
    /// Unique id of this module instance within the rack.
    fn module_id(&self) -> i32;

    /// Called when the module is added to the rack. Register topics and
    /// subscribe here.
    fn on_add(self: Arc<Self>, _broker: &Arc<ContextBroker>) {}

    /// Called when the module is removed from the rack. Unregister and
    /// unsubscribe here.
    fn on_remove(self: Arc<Self>, _broker: &Arc<ContextBroker>) {}

    /// Audio block entry, called by the audio thread with a fixed block
    /// size. Must never block on bus primitives.
    fn process(&self, output: &mut [f32], frames: usize);
}

// ============================================================================
// Thread-role introspection (diagnostics only)
// ============================================================================

/// Which role the current thread plays. Used only for diagnostics — a wrong
/// role logs a warning, it never changes behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadRole {
    /// Hard-real-time audio thread running module `process` calls.
    Audio,
    /// UI/control thread.
    Ui,
    /// The bus dispatch worker.
    Worker,
    /// Not tagged.
    #[default]
    Unknown,
}

thread_local! {
    static CURRENT_ROLE: Cell<ThreadRole> = const { Cell::new(ThreadRole::Unknown) };
}

/// Tag the current thread with a role. The host calls this when it spawns
/// its audio and UI threads; the broker tags its own worker.
pub fn set_thread_role(role: ThreadRole) {
    CURRENT_ROLE.with(|r| r.set(role));
}

/// The role the current thread was tagged with, or `Unknown`.
pub fn current_thread_role() -> ThreadRole {
    CURRENT_ROLE.with(|r| r.get())
}
