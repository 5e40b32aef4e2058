//! Reference subscriber: decodes on the worker thread, hands records across
//! an SPSC ring, drains a bounded number per audio block.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::broker::ContextBroker;
use crate::codec;
use crate::config::AdapterConfig;
use crate::message::Message;
use crate::module::{current_thread_role, ContextSubscriber, Module, ThreadRole};
use crate::ring::RingBuffer;
use crate::value::{ContextValue, DecodedRecord};

use super::topics;

/// Parameter state applied by the audio thread, readable by UI threads.
struct SubscriberState {
    parameter1: f32,
    parameter2: f32,
    preset: String,
    parameter_array: Arc<[f32]>,
}

/// A module that subscribes to the reference topics and applies received
/// values inside its audio block.
///
/// The worker-thread side ([`ContextSubscriber::on_message`]) decodes and
/// pushes; the audio-thread side ([`Module::process`]) pops at most
/// `max_records_per_block` records per call so bus traffic can never blow an
/// audio deadline. A full ring drops the newest record and counts the
/// overflow.
pub struct ReferenceSubscriber {
    module_id: i32,
    default_topics: Vec<String>,
    subscribed: Mutex<Vec<String>>,
    queue: RingBuffer<DecodedRecord>,
    state: Mutex<SubscriberState>,
    max_records_per_block: usize,
    messages_received: AtomicU64,
    messages_processed: AtomicU64,
    queue_overflows: AtomicU64,
    counts_by_topic: Mutex<HashMap<String, u64>>,
}

impl ReferenceSubscriber {
    pub fn new(module_id: i32) -> Arc<Self> {
        Self::with_config(module_id, AdapterConfig::default())
    }

    pub fn with_config(module_id: i32, config: AdapterConfig) -> Arc<Self> {
        Arc::new(Self {
            module_id,
            default_topics: vec![
                topics::PARAMETER_1.to_string(),
                topics::PARAMETER_2.to_string(),
                topics::PRESET.to_string(),
                topics::PARAMETERS.to_string(),
            ],
            subscribed: Mutex::new(Vec::new()),
            queue: RingBuffer::new(config.queue_capacity),
            state: Mutex::new(SubscriberState {
                parameter1: 0.0,
                parameter2: 0.0,
                preset: String::new(),
                parameter_array: Arc::from(vec![0.0; 5].into_boxed_slice()),
            }),
            max_records_per_block: config.max_records_per_block,
            messages_received: AtomicU64::new(0),
            messages_processed: AtomicU64::new(0),
            queue_overflows: AtomicU64::new(0),
            counts_by_topic: Mutex::new(HashMap::new()),
        })
    }

    /// Subscribe to one topic, tracking it for later cleanup.
    pub fn subscribe_topic(self: &Arc<Self>, broker: &ContextBroker, topic: &str) -> bool {
        {
            let subscribed = self.subscribed.lock();
            if subscribed.iter().any(|t| t == topic) {
                return true;
            }
        }
        let handle: Arc<dyn ContextSubscriber> = self.clone();
        if broker.subscribe(topic, &handle) {
            self.subscribed.lock().push(topic.to_string());
            true
        } else {
            false
        }
    }

    /// Unsubscribe from one topic.
    pub fn unsubscribe_topic(self: &Arc<Self>, broker: &ContextBroker, topic: &str) -> bool {
        let mut subscribed = self.subscribed.lock();
        let Some(pos) = subscribed.iter().position(|t| t == topic) else {
            return false;
        };
        let handle: Arc<dyn ContextSubscriber> = self.clone();
        if broker.unsubscribe(topic, &handle) {
            subscribed.remove(pos);
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Parameter accessors (UI/control threads)
    // ------------------------------------------------------------------

    /// Current value of parameter 1 or 2; 0.0 for any other index.
    pub fn parameter(&self, index: usize) -> f32 {
        let state = self.state.lock();
        match index {
            1 => state.parameter1,
            2 => state.parameter2,
            _ => 0.0,
        }
    }

    /// Current preset name.
    pub fn preset(&self) -> String {
        self.state.lock().preset.clone()
    }

    /// Current parameter bank (shared, immutable).
    pub fn parameter_array(&self) -> Arc<[f32]> {
        Arc::clone(&self.state.lock().parameter_array)
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    pub fn queue_overflows(&self) -> u64 {
        self.queue_overflows.load(Ordering::Relaxed)
    }

    /// Records decoded but not yet drained by the audio thread. Advisory.
    pub fn pending_records(&self) -> usize {
        self.queue.len()
    }

    /// Messages received so far on one topic.
    pub fn received_on(&self, topic: &str) -> u64 {
        self.counts_by_topic.lock().get(topic).copied().unwrap_or(0)
    }

    /// Decode a message into the record the audio thread expects for its
    /// topic. `None` for unknown topics (ignored) and decode failures
    /// (logged).
    fn decode_record(&self, message: &Message) -> Option<DecodedRecord> {
        let value = match message.topic.as_str() {
            topics::PARAMETER_1 | topics::PARAMETER_2 => {
                codec::decode::<f32>(message).map(ContextValue::Float)
            }
            topics::PRESET => codec::decode::<String>(message).map(ContextValue::Text),
            topics::PARAMETERS => {
                codec::decode::<Vec<f32>>(message).map(|v| ContextValue::FloatArray(v.into()))
            }
            _ => return None,
        };
        match value {
            Ok(value) => Some(DecodedRecord {
                topic: Arc::from(message.topic.as_str()),
                value,
            }),
            Err(err) => {
                log::warn!(
                    "subscriber {} failed to decode '{}': {}",
                    self.module_id,
                    message.topic,
                    err
                );
                None
            }
        }
    }

    /// Apply one drained record to the parameter state.
    fn apply_record(&self, record: DecodedRecord) {
        let mut state = self.state.lock();
        match (&*record.topic, record.value) {
            (topics::PARAMETER_1, ContextValue::Float(v)) => state.parameter1 = v,
            (topics::PARAMETER_2, ContextValue::Float(v)) => state.parameter2 = v,
            (topics::PRESET, ContextValue::Text(v)) => state.preset = v,
            (topics::PARAMETERS, ContextValue::FloatArray(v)) => state.parameter_array = v,
            (topic, value) => {
                log::debug!("subscriber {} ignoring {:?} on '{}'", self.module_id, value, topic);
            }
        }
    }
}

impl ContextSubscriber for ReferenceSubscriber {
    fn on_message(&self, message: &Message) {
        // Worker-thread entry. The role check is diagnostic only.
        if current_thread_role() == ThreadRole::Audio {
            log::warn!("on_message invoked from the audio thread");
        }

        self.messages_received.fetch_add(1, Ordering::Relaxed);
        *self
            .counts_by_topic
            .lock()
            .entry(message.topic.clone())
            .or_insert(0) += 1;

        let Some(record) = self.decode_record(message) else {
            return;
        };
        if self.queue.push(record).is_err() {
            // Ring full: drop the record rather than block the worker.
            self.queue_overflows.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Module for ReferenceSubscriber {
    fn module_id(&self) -> i32 {
        self.module_id
    }

    fn on_add(self: Arc<Self>, broker: &Arc<ContextBroker>) {
        for topic in self.default_topics.clone() {
            if !self.subscribe_topic(broker, &topic) {
                log::warn!("subscriber {} failed to subscribe '{}'", self.module_id, topic);
            }
        }
    }

    fn on_remove(self: Arc<Self>, broker: &Arc<ContextBroker>) {
        let handle: Arc<dyn ContextSubscriber> = self.clone();
        broker.unsubscribe_all(&handle);
        self.subscribed.lock().clear();
    }

    fn process(&self, output: &mut [f32], frames: usize) {
        if current_thread_role() == ThreadRole::Worker {
            log::warn!("process invoked from the dispatch worker");
        }

        // Drain a bounded number of records so servicing the bus costs
        // bounded CPU inside the audio deadline.
        let mut drained = 0;
        while drained < self.max_records_per_block {
            let Some(record) = self.queue.pop() else {
                break;
            };
            self.apply_record(record);
            drained += 1;
        }
        if drained > 0 {
            self.messages_processed.fetch_add(drained as u64, Ordering::Relaxed);
        }
        if drained == self.max_records_per_block && !self.queue.is_empty() {
            log::debug!(
                "subscriber {} hit the per-block drain bound, {} records still queued",
                self.module_id,
                self.queue.len()
            );
        }

        // Render with whatever the parameters are now.
        let (p1, p2) = {
            let state = self.state.lock();
            (state.parameter1, state.parameter2)
        };
        let frames = frames.min(output.len());
        for (i, sample) in output.iter_mut().take(frames).enumerate() {
            let t = i as f32 / frames.max(1) as f32;
            let modulation = p2 * 0.5 * (t * 10.0).sin();
            *sample = p1 * (t * 5.0 + modulation * 3.0).sin();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::msgpack_message;
    use crate::config::AdapterConfig;

    fn push_value<T: serde::Serialize>(sub: &ReferenceSubscriber, topic: &str, value: &T) {
        let message = msgpack_message(topic, 9, value).unwrap();
        sub.on_message(&message);
    }

    #[test]
    fn decoded_values_reach_parameters_after_process() {
        let sub = ReferenceSubscriber::new(5);
        push_value(&sub, topics::PARAMETER_1, &0.8f32);
        push_value(&sub, topics::PRESET, &"lead".to_string());
        push_value(&sub, topics::PARAMETERS, &vec![0.1f32, 0.2, 0.3]);

        assert_eq!(sub.messages_received(), 3);
        assert_eq!(sub.pending_records(), 3);
        // Values are not applied until the audio thread drains.
        assert_eq!(sub.parameter(1), 0.0);

        let mut block = [0.0f32; 16];
        sub.process(&mut block, 16);

        assert_eq!(sub.parameter(1), 0.8);
        assert_eq!(sub.preset(), "lead");
        assert_eq!(&sub.parameter_array()[..], &[0.1, 0.2, 0.3]);
        assert_eq!(sub.messages_processed(), 3);
        assert_eq!(sub.pending_records(), 0);
    }

    #[test]
    fn drain_is_bounded_per_block() {
        let sub = ReferenceSubscriber::with_config(
            5,
            AdapterConfig {
                queue_capacity: 64,
                max_records_per_block: 10,
            },
        );
        for i in 0..25 {
            push_value(&sub, topics::PARAMETER_1, &(i as f32 / 25.0));
        }

        let mut block = [0.0f32; 8];
        sub.process(&mut block, 8);
        assert_eq!(sub.messages_processed(), 10);
        assert_eq!(sub.pending_records(), 15);

        sub.process(&mut block, 8);
        sub.process(&mut block, 8);
        assert_eq!(sub.messages_processed(), 25);
        assert_eq!(sub.pending_records(), 0);
        // Last value wins.
        assert_eq!(sub.parameter(1), 24.0 / 25.0);
    }

    #[test]
    fn overflow_drops_and_counts() {
        let sub = ReferenceSubscriber::with_config(
            5,
            AdapterConfig {
                queue_capacity: 4,
                max_records_per_block: 10,
            },
        );
        for i in 0..10 {
            push_value(&sub, topics::PARAMETER_2, &(i as f32));
        }
        assert_eq!(sub.messages_received(), 10);
        assert_eq!(sub.queue_overflows(), 6);
        assert_eq!(sub.pending_records(), 4);
    }

    #[test]
    fn unknown_topics_and_bad_payloads_are_ignored() {
        let sub = ReferenceSubscriber::new(5);
        push_value(&sub, "unrelated/topic", &1.0f32);
        // Wrong type for the topic: decodes as error, not a record.
        push_value(&sub, topics::PARAMETER_1, &"not a float".to_string());

        assert_eq!(sub.messages_received(), 2);
        assert_eq!(sub.pending_records(), 0);
        assert_eq!(sub.received_on("unrelated/topic"), 1);
    }

    #[test]
    fn per_topic_counts_accumulate() {
        let sub = ReferenceSubscriber::new(5);
        push_value(&sub, topics::PARAMETER_1, &0.1f32);
        push_value(&sub, topics::PARAMETER_1, &0.2f32);
        push_value(&sub, topics::PRESET, &"a".to_string());

        assert_eq!(sub.received_on(topics::PARAMETER_1), 2);
        assert_eq!(sub.received_on(topics::PRESET), 1);
        assert_eq!(sub.received_on(topics::PARAMETERS), 0);
    }

    #[test]
    fn subscribe_topic_tracks_and_deduplicates() {
        let broker = Arc::new(ContextBroker::new());
        let sub = ReferenceSubscriber::new(5);

        assert!(sub.subscribe_topic(&broker, "extra/topic"));
        // Second call is a tracked no-op, still reported as subscribed.
        assert!(sub.subscribe_topic(&broker, "extra/topic"));
        assert_eq!(sub.subscribed.lock().len(), 1);

        assert!(sub.unsubscribe_topic(&broker, "extra/topic"));
        assert!(!sub.unsubscribe_topic(&broker, "extra/topic"));
        broker.shutdown();
    }
}
