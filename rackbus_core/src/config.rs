//! Configuration structs for the broker and the reference audio adapter.
//!
//! Plain serde structs with defaults, so hosts can load them from whatever
//! config file format they already use.

use serde::{Deserialize, Serialize};

fn default_worker_thread_name() -> String {
    "rackbus-dispatch".to_string()
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    32
}

fn default_max_records_per_block() -> usize {
    10
}

/// Broker construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Name given to the dispatch worker thread.
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,

    /// Whether shutdown delivers messages still queued in the FIFO before
    /// the worker exits. When false the worker exits immediately and queued
    /// messages are dropped.
    #[serde(default = "default_true")]
    pub drain_on_shutdown: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            worker_thread_name: default_worker_thread_name(),
            drain_on_shutdown: true,
        }
    }
}

/// Options for the reference subscriber's worker→audio hand-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Capacity of the decoded-record ring buffer. Records arriving while
    /// the ring is full are dropped (and counted), never blocked on.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound on records drained per `process` call, so servicing the
    /// bus costs bounded CPU inside an audio deadline. A tunable, not a
    /// contract.
    #[serde(default = "default_max_records_per_block")]
    pub max_records_per_block: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_records_per_block: default_max_records_per_block(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let broker = BrokerConfig::default();
        assert_eq!(broker.worker_thread_name, "rackbus-dispatch");
        assert!(broker.drain_on_shutdown);

        let adapter = AdapterConfig::default();
        assert_eq!(adapter.queue_capacity, 32);
        assert_eq!(adapter.max_records_per_block, 10);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let adapter: AdapterConfig = serde_json::from_str(r#"{"queue_capacity": 64}"#).unwrap();
        assert_eq!(adapter.queue_capacity, 64);
        assert_eq!(adapter.max_records_per_block, 10);

        let broker: BrokerConfig = serde_json::from_str("{}").unwrap();
        assert!(broker.drain_on_shutdown);
    }
}
