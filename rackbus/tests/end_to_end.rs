//! Whole-system tests: modules attached through their lifecycle callbacks,
//! messages flowing publisher → broker worker → ring → audio thread.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rackbus::prelude::*;
use rackbus::reference::topics;

/// Poll `predicate` for up to a second.
fn wait_until(predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    predicate()
}

#[test]
fn reference_rack_round_trip() {
    let broker = Arc::new(ContextBroker::new());
    let provider = ReferenceProvider::new(1);
    let listener = ReferenceSubscriber::new(2);

    provider.clone().on_add(&broker);
    listener.clone().on_add(&broker);

    // Provider topics are discoverable once the module is in the rack.
    let mut topics_seen = broker.available_topics();
    topics_seen.sort();
    assert_eq!(topics_seen.len(), 4);
    assert!(!broker.find_providers(topics::PARAMETER_1).is_empty());

    // One value per topic, decoded and applied by the audio thread.
    assert!(provider.publish_value(&broker, topics::PARAMETER_1, &0.9f32));
    assert!(provider.publish_value(&broker, topics::PARAMETER_2, &0.25f32));
    assert!(provider.publish_value(&broker, topics::PRESET, &"warm pad".to_string()));
    assert!(provider.publish_value(&broker, topics::PARAMETERS, &vec![0.1f32, 0.2, 0.3]));
    assert!(wait_until(|| listener.messages_received() == 4));

    set_thread_role(ThreadRole::Audio);
    let mut block = [0.0f32; 64];
    listener.process(&mut block, 64);
    set_thread_role(ThreadRole::Unknown);

    assert_eq!(listener.parameter(1), 0.9);
    assert_eq!(listener.parameter(2), 0.25);
    assert_eq!(listener.preset(), "warm pad");
    assert_eq!(&listener.parameter_array()[..], &[0.1, 0.2, 0.3]);
    // Non-zero amplitude means the block actually rendered.
    assert!(block.iter().any(|s| *s != 0.0));

    listener.clone().on_remove(&broker);
    provider.clone().on_remove(&broker);
    assert!(broker.available_topics().is_empty());
    broker.shutdown();
}

#[test]
fn periodic_provider_feeds_audio_pump() {
    let broker = Arc::new(ContextBroker::new());
    let provider = ReferenceProvider::new(1);
    let listener = ReferenceSubscriber::new(2);
    provider.clone().on_add(&broker);
    listener.clone().on_add(&broker);

    provider.start_periodic_publishing(Arc::clone(&broker), Duration::from_millis(5));

    // Simulated audio thread: fixed-size blocks at a steady cadence.
    let pump = {
        let listener = listener.clone();
        thread::spawn(move || {
            set_thread_role(ThreadRole::Audio);
            let mut block = [0.0f32; 32];
            for _ in 0..60 {
                listener.process(&mut block, 32);
                thread::sleep(Duration::from_millis(2));
            }
        })
    };

    assert!(wait_until(|| listener.messages_processed() >= 8));
    pump.join().unwrap();

    provider.clone().on_remove(&broker);
    listener.clone().on_remove(&broker);
    broker.shutdown();

    // Every decoded record either got applied or is still queued; nothing
    // vanished.
    assert!(listener.messages_processed() + listener.pending_records() as u64
        <= listener.messages_received());
}

#[test]
fn removing_a_module_stops_its_deliveries() {
    let broker = Arc::new(ContextBroker::new());
    let provider = ReferenceProvider::new(1);
    let listener = ReferenceSubscriber::new(2);
    provider.clone().on_add(&broker);
    listener.clone().on_add(&broker);

    assert!(provider.publish_value(&broker, topics::PARAMETER_1, &0.5f32));
    assert!(wait_until(|| listener.messages_received() == 1));

    listener.clone().on_remove(&broker);
    assert!(provider.publish_value(&broker, topics::PARAMETER_1, &0.7f32));
    thread::sleep(Duration::from_millis(30));
    assert_eq!(listener.messages_received(), 1);

    provider.clone().on_remove(&broker);
    broker.shutdown();
}

#[test]
fn dropping_a_provider_cleans_the_registry() {
    let broker = Arc::new(ContextBroker::new());
    let provider = ReferenceProvider::new(1);
    provider.clone().on_add(&broker);

    assert!(broker
        .available_topics()
        .contains(&topics::PARAMETER_1.to_string()));

    // Losing the last strong reference (without on_remove) must still make
    // the provider invisible on the next registry visit.
    drop(provider);
    assert!(broker.find_providers(topics::PARAMETER_1).is_empty());
    assert!(broker.available_topics().is_empty());
    broker.shutdown();
}

#[test]
fn process_wide_instance_round_trip() {
    let broker = context_broker();
    assert!(Arc::ptr_eq(&broker, &context_broker()));
    assert_eq!(broker.version(), PROTOCOL_VERSION);

    let listener = ReferenceSubscriber::new(3);
    listener.clone().on_add(&broker);
    assert!(broker.publish(msgpack_message(topics::PRESET, 1, &"init".to_string()).unwrap()));
    assert!(wait_until(|| listener.messages_received() == 1));

    shutdown_context_broker();
    // A fresh instance appears on next access.
    let fresh = context_broker();
    assert!(!Arc::ptr_eq(&broker, &fresh));
    shutdown_context_broker();
}

#[test]
fn facade_exposes_version() {
    assert!(!rackbus::version().is_empty());
    assert_eq!(rackbus::VERSION, env!("CARGO_PKG_VERSION"));
}
