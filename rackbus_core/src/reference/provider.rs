//! Reference provider: registers topics, publishes serialized parameter
//! state, optionally on a periodic worker.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use crate::broker::ContextBroker;
use crate::codec;
use crate::module::{ContextProvider, Module};

use super::topics;

/// Parameter state the provider publishes.
struct ProviderState {
    parameter1: f32,
    parameter2: f32,
    preset: String,
    parameter_array: Vec<f32>,
}

/// Stop flag + condvar so the publish loop's sleep is interruptible.
struct PublishControl {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// A module that offers the reference topics and publishes its parameter
/// state, either on demand or from a periodic worker thread.
pub struct ReferenceProvider {
    module_id: i32,
    topics: Vec<String>,
    state: Mutex<ProviderState>,
    control: Arc<PublishControl>,
    publisher: Mutex<Option<JoinHandle<()>>>,
}

impl ReferenceProvider {
    pub fn new(module_id: i32) -> Arc<Self> {
        Arc::new(Self {
            module_id,
            topics: vec![
                topics::PARAMETER_1.to_string(),
                topics::PARAMETER_2.to_string(),
                topics::PRESET.to_string(),
                topics::PARAMETERS.to_string(),
            ],
            state: Mutex::new(ProviderState {
                parameter1: 0.0,
                parameter2: 0.5,
                preset: "Default".to_string(),
                parameter_array: vec![0.5, 0.3, 0.8, 0.2, 0.6],
            }),
            control: Arc::new(PublishControl {
                stopped: Mutex::new(false),
                wake: Condvar::new(),
            }),
            publisher: Mutex::new(None),
        })
    }

    /// Serialize `value` and publish it on `topic`.
    ///
    /// Codec failures are logged and reported as `false`, never propagated —
    /// a broken payload must not take down the caller's control loop.
    pub fn publish_value<T: Serialize>(
        &self,
        broker: &ContextBroker,
        topic: &str,
        value: &T,
    ) -> bool {
        match codec::msgpack_message(topic, self.module_id, value) {
            Ok(message) => broker.publish(message),
            Err(err) => {
                log::error!("provider {} failed to encode '{}': {}", self.module_id, topic, err);
                false
            }
        }
    }

    /// Publish the current value of every reference topic.
    pub fn publish_all(&self, broker: &ContextBroker) {
        let (p1, p2, preset, bank) = {
            let state = self.state.lock();
            (
                state.parameter1,
                state.parameter2,
                state.preset.clone(),
                state.parameter_array.clone(),
            )
        };
        self.publish_value(broker, topics::PARAMETER_1, &p1);
        self.publish_value(broker, topics::PARAMETER_2, &p2);
        self.publish_value(broker, topics::PRESET, &preset);
        self.publish_value(broker, topics::PARAMETERS, &bank);
    }

    /// Nudge the parameter state so periodic publishes carry fresh values.
    pub fn update_parameters(&self) {
        let mut state = self.state.lock();
        state.parameter1 = (state.parameter1 + 0.01).rem_euclid(1.0);
        state.parameter2 = (state.parameter2 + 0.005).rem_euclid(1.0);
        for (i, v) in state.parameter_array.iter_mut().enumerate() {
            *v = (*v + 0.01 * (i as f32 + 1.0)).rem_euclid(1.0);
        }
    }

    /// Replace the preset name (and nothing else).
    pub fn set_preset(&self, preset: impl Into<String>) {
        self.state.lock().preset = preset.into();
    }

    /// Start a worker that updates and publishes all topics every
    /// `interval`, until [`stop_periodic_publishing`](Self::stop_periodic_publishing)
    /// or module removal.
    ///
    /// The worker holds only a weak handle to the provider, so it cannot
    /// keep a removed module alive; it exits on its own if the provider is
    /// dropped.
    pub fn start_periodic_publishing(
        self: &Arc<Self>,
        broker: Arc<ContextBroker>,
        interval: Duration,
    ) {
        let mut publisher = self.publisher.lock();
        if publisher.is_some() {
            return;
        }
        *self.control.stopped.lock() = false;

        let weak: Weak<Self> = Arc::downgrade(self);
        let control = Arc::clone(&self.control);
        let handle = thread::Builder::new()
            .name(format!("rackbus-provider-{}", self.module_id))
            .spawn(move || loop {
                {
                    let mut stopped = control.stopped.lock();
                    if !*stopped {
                        let _ = control.wake.wait_for(&mut stopped, interval);
                    }
                    if *stopped {
                        return;
                    }
                }
                let Some(provider) = weak.upgrade() else {
                    return;
                };
                provider.update_parameters();
                provider.publish_all(&broker);
            })
            .expect("failed to spawn provider publish thread");
        *publisher = Some(handle);
    }

    /// Stop the periodic worker and join it. Idempotent.
    pub fn stop_periodic_publishing(&self) {
        {
            let mut stopped = self.control.stopped.lock();
            *stopped = true;
        }
        self.control.wake.notify_all();
        if let Some(handle) = self.publisher.lock().take() {
            let _ = handle.join();
        }
    }
}

impl ContextProvider for ReferenceProvider {
    fn provided_topics(&self) -> Vec<String> {
        self.topics.clone()
    }
}

impl Module for ReferenceProvider {
    fn module_id(&self) -> i32 {
        self.module_id
    }

    fn on_add(self: Arc<Self>, broker: &Arc<ContextBroker>) {
        let handle: Arc<dyn ContextProvider> = self.clone();
        for topic in &self.topics {
            if !broker.register_context(topic, &handle) {
                log::warn!("provider {} failed to register '{}'", self.module_id, topic);
            }
        }
    }

    fn on_remove(self: Arc<Self>, broker: &Arc<ContextBroker>) {
        self.stop_periodic_publishing();
        let handle: Arc<dyn ContextProvider> = self.clone();
        for topic in &self.topics {
            broker.unregister_context(topic, &handle);
        }
    }

    fn process(&self, output: &mut [f32], frames: usize) {
        // Providers render too; a plain sine shaped by the current
        // parameters keeps the reference rack audible.
        let (p1, p2) = {
            let state = self.state.lock();
            (state.parameter1, state.parameter2)
        };
        let frames = frames.min(output.len());
        for (i, sample) in output.iter_mut().take(frames).enumerate() {
            let t = i as f32 / frames.max(1) as f32;
            *sample = p1 * (t * 5.0 + p2).sin();
        }
    }
}
