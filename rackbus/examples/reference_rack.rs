//! The reference rack end to end: a provider publishing periodically, a
//! subscriber applying values inside simulated audio blocks.
//!
//! Run with `cargo run --example reference_rack`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rackbus::prelude::*;

fn main() {
    let rack = Rack::new(Arc::new(ContextBroker::new()));

    let provider = ReferenceProvider::new(1);
    let listener = ReferenceSubscriber::new(2);
    rack.add_module(provider.clone());
    rack.add_module(listener.clone());
    println!("racked {} modules", rack.module_count());

    provider.set_preset("warm pad");
    provider.start_periodic_publishing(Arc::clone(rack.broker()), Duration::from_millis(20));

    // Simulated audio thread: 64-frame blocks at a steady cadence.
    let mut block = [0.0f32; 64];
    for cycle in 1..=50 {
        rack.process_block(&mut block, 64);
        thread::sleep(Duration::from_millis(5));

        if cycle % 10 == 0 {
            println!(
                "cycle {:2}: parameter1={:.3} parameter2={:.3} preset='{}' pending={}",
                cycle,
                listener.parameter(1),
                listener.parameter(2),
                listener.preset(),
                listener.pending_records(),
            );
        }
    }

    provider.stop_periodic_publishing();
    println!(
        "listener stats: received={} processed={} overflows={}",
        listener.messages_received(),
        listener.messages_processed(),
        listener.queue_overflows(),
    );
    let stats = rack.broker().stats();
    println!(
        "broker stats: published={} delivered={} faults={}",
        stats.published, stats.delivered, stats.subscriber_faults,
    );

    rack.remove_module(2);
    rack.remove_module(1);
    rack.broker().shutdown();
}
