//! Registration walkthrough: register providers, discover topics, clean up.
//!
//! Run with `cargo run --example broker_registration`.

use std::sync::Arc;

use rackbus::prelude::*;

struct ClockModule;

impl ContextProvider for ClockModule {
    fn provided_topics(&self) -> Vec<String> {
        vec!["clock/bpm".to_string(), "clock/running".to_string()]
    }
}

struct ScopeModule;

impl ContextProvider for ScopeModule {
    fn provided_topics(&self) -> Vec<String> {
        vec!["scope/trigger".to_string()]
    }
}

fn main() {
    let broker = ContextBroker::new();
    println!("broker protocol version: {}", broker.version());

    let clock: Arc<dyn ContextProvider> = Arc::new(ClockModule);
    let scope: Arc<dyn ContextProvider> = Arc::new(ScopeModule);

    for topic in clock.provided_topics() {
        println!("registering clock on '{}': {}", topic, broker.register_context(&topic, &clock));
    }
    for topic in scope.provided_topics() {
        println!("registering scope on '{}': {}", topic, broker.register_context(&topic, &scope));
    }
    // A second registration of the same module is a no-op.
    println!(
        "duplicate registration rejected: {}",
        !broker.register_context("clock/bpm", &clock)
    );

    let mut topics = broker.available_topics();
    topics.sort();
    println!("available topics: {:?}", topics);
    println!(
        "providers for clock/bpm: {}",
        broker.find_providers("clock/bpm").len()
    );

    // Dropping a module is enough: the registry only holds weak handles.
    drop(scope);
    println!(
        "providers for scope/trigger after drop: {}",
        broker.find_providers("scope/trigger").len()
    );

    for topic in clock.provided_topics() {
        broker.unregister_context(&topic, &clock);
    }
    println!("topics after cleanup: {:?}", broker.available_topics());

    broker.shutdown();
}
