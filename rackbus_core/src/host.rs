//! Minimal rack host for demos and tests.
//!
//! Stands in for the real module host: owns module instances, drives their
//! lifecycle callbacks against one broker, and mixes their audio blocks.
//! Production hosts bring their own engine; the bus only ever sees the
//! [`Module`] trait.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::broker::ContextBroker;
use crate::module::{set_thread_role, Module, ThreadRole};

/// A rack of modules wired to one broker.
pub struct Rack {
    broker: Arc<ContextBroker>,
    modules: Mutex<Vec<Arc<dyn Module>>>,
    /// Reused mix buffer so steady-state blocks do not allocate.
    scratch: Mutex<Vec<f32>>,
}

impl Rack {
    pub fn new(broker: Arc<ContextBroker>) -> Self {
        Self {
            broker,
            modules: Mutex::new(Vec::new()),
            scratch: Mutex::new(Vec::new()),
        }
    }

    /// The broker this rack wires its modules to.
    pub fn broker(&self) -> &Arc<ContextBroker> {
        &self.broker
    }

    /// Add a module and run its `on_add` lifecycle callback.
    ///
    /// Returns `false` (without calling `on_add`) when a module with the
    /// same id is already racked.
    pub fn add_module(&self, module: Arc<dyn Module>) -> bool {
        {
            let mut modules = self.modules.lock();
            if modules.iter().any(|m| m.module_id() == module.module_id()) {
                log::debug!("module {} is already racked", module.module_id());
                return false;
            }
            modules.push(Arc::clone(&module));
        }
        module.on_add(&self.broker);
        true
    }

    /// Remove the module with `module_id`, running its `on_remove` callback
    /// before the rack drops its handle.
    pub fn remove_module(&self, module_id: i32) -> bool {
        let removed = {
            let mut modules = self.modules.lock();
            let Some(pos) = modules.iter().position(|m| m.module_id() == module_id) else {
                return false;
            };
            modules.remove(pos)
        };
        removed.on_remove(&self.broker);
        true
    }

    pub fn module_count(&self) -> usize {
        self.modules.lock().len()
    }

    /// One audio block: run every module's `process` and mix the results
    /// into `output`. Call this from the audio thread.
    pub fn process_block(&self, output: &mut [f32], frames: usize) {
        set_thread_role(ThreadRole::Audio);
        let modules = self.modules.lock();
        let frames = frames.min(output.len());
        output[..frames].fill(0.0);
        let mut scratch = self.scratch.lock();
        scratch.resize(frames, 0.0);
        for module in modules.iter() {
            scratch.fill(0.0);
            module.process(&mut scratch, frames);
            for (out, s) in output[..frames].iter_mut().zip(scratch.iter()) {
                *out += *s;
            }
        }
    }
}

impl Drop for Rack {
    fn drop(&mut self) {
        // Tearing down the rack removes every module, exactly as if the
        // host had ejected them one by one.
        let modules = std::mem::take(&mut *self.modules.lock());
        for module in modules {
            module.on_remove(&self.broker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{topics, ReferenceProvider, ReferenceSubscriber};

    #[test]
    fn add_and_remove_drive_lifecycle() {
        let rack = Rack::new(Arc::new(ContextBroker::new()));
        let provider = ReferenceProvider::new(1);

        assert!(rack.add_module(provider.clone()));
        assert_eq!(rack.module_count(), 1);
        assert!(!rack.broker().available_topics().is_empty());

        assert!(rack.remove_module(1));
        assert_eq!(rack.module_count(), 0);
        assert!(rack.broker().available_topics().is_empty());
        assert!(!rack.remove_module(1));
        rack.broker().shutdown();
    }

    #[test]
    fn duplicate_module_ids_are_rejected() {
        let rack = Rack::new(Arc::new(ContextBroker::new()));
        assert!(rack.add_module(ReferenceProvider::new(7)));
        assert!(!rack.add_module(ReferenceSubscriber::new(7)));
        assert_eq!(rack.module_count(), 1);
        rack.broker().shutdown();
    }

    #[test]
    fn drop_removes_remaining_modules() {
        let broker = Arc::new(ContextBroker::new());
        {
            let rack = Rack::new(Arc::clone(&broker));
            rack.add_module(ReferenceProvider::new(1));
            assert!(!broker.available_topics().is_empty());
        }
        assert!(broker.available_topics().is_empty());
        broker.shutdown();
    }

    #[test]
    fn process_block_mixes_all_modules() {
        let rack = Rack::new(Arc::new(ContextBroker::new()));
        let provider = ReferenceProvider::new(1);
        let listener = ReferenceSubscriber::new(2);
        rack.add_module(provider.clone());
        rack.add_module(listener.clone());

        // Prime both modules with a non-zero amplitude.
        provider.publish_value(rack.broker(), topics::PARAMETER_1, &0.8f32);
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(1);
        while listener.messages_received() < 1 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let mut block = [0.0f32; 32];
        rack.process_block(&mut block, 32);
        assert!(block.iter().any(|s| *s != 0.0));
        rack.broker().shutdown();
    }
}
