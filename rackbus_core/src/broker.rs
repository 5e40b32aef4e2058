//! The broker: registry facade, dispatch worker, and the process-wide
//! instance.
//!
//! `publish` validates, appends to a FIFO under a short lock, signals the
//! worker, and returns — it never runs subscriber code on the publishing
//! thread. The single worker thread pops one message at a time, snapshots
//! the live subscribers for its topic (brief registry lock, lazy purge),
//! releases the lock, then delivers. Each callback runs inside
//! `catch_unwind`: one panicking subscriber is logged and skipped, never
//! allowed to starve its siblings or kill the worker.
//!
//! Messages from one publisher to one topic pass through the FIFO in publish
//! order, so each subscriber sees that publisher's sequence in order.
//! Priority is recorded on messages but dispatch is strict FIFO.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::config::BrokerConfig;
use crate::error::RackbusError;
use crate::message::Message;
use crate::module::{set_thread_role, ContextProvider, ContextSubscriber, ThreadRole};
use crate::registry::Registry;

/// Protocol major version reported by [`ContextBroker::version`].
pub const PROTOCOL_VERSION: u32 = 1;

/// FIFO state shared between publishers and the worker.
struct QueueState {
    fifo: VecDeque<Arc<Message>>,
    running: bool,
}

struct DispatchShared {
    queue: Mutex<QueueState>,
    available: Condvar,
}

/// Dispatch counters. Snapshot values; read with [`ContextBroker::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Messages accepted by `publish`.
    pub published: u64,
    /// Subscriber callbacks invoked to completion.
    pub delivered: u64,
    /// Messages dequeued with no live subscriber on their topic.
    pub dropped_no_subscriber: u64,
    /// Subscriber callbacks that panicked and were isolated.
    pub subscriber_faults: u64,
}

#[derive(Default)]
struct StatCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    dropped_no_subscriber: AtomicU64,
    subscriber_faults: AtomicU64,
}

/// The process-wide context bus: topic registry plus dispatch worker.
///
/// One instance per process in normal use (see [`context_broker`]); tests
/// construct brokers directly for isolation.
pub struct ContextBroker {
    registry: Arc<Registry>,
    shared: Arc<DispatchShared>,
    stats: Arc<StatCounters>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ContextBroker {
    /// Create a broker and start its dispatch worker.
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    /// Create a broker with explicit options.
    pub fn with_config(config: BrokerConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let shared = Arc::new(DispatchShared {
            queue: Mutex::new(QueueState {
                fifo: VecDeque::new(),
                running: true,
            }),
            available: Condvar::new(),
        });
        let stats = Arc::new(StatCounters::default());

        let worker = {
            let registry = Arc::clone(&registry);
            let shared = Arc::clone(&shared);
            let stats = Arc::clone(&stats);
            let drain = config.drain_on_shutdown;
            thread::Builder::new()
                .name(config.worker_thread_name.clone())
                .spawn(move || {
                    set_thread_role(ThreadRole::Worker);
                    Self::worker_loop(&registry, &shared, &stats, drain);
                })
                .expect("failed to spawn rackbus dispatch worker")
        };

        Self {
            registry,
            shared,
            stats,
            worker: Mutex::new(Some(worker)),
        }
    }

    // ------------------------------------------------------------------
    // Registry facade
    // ------------------------------------------------------------------

    /// Register a provider for a topic. See [`Registry::register_context`].
    pub fn register_context(&self, topic: &str, provider: &Arc<dyn ContextProvider>) -> bool {
        self.registry.register_context(topic, provider)
    }

    /// Unregister a provider from a topic. See [`Registry::unregister_context`].
    pub fn unregister_context(&self, topic: &str, provider: &Arc<dyn ContextProvider>) -> bool {
        self.registry.unregister_context(topic, provider)
    }

    /// Subscribe to a topic. See [`Registry::subscribe`].
    pub fn subscribe(&self, topic: &str, subscriber: &Arc<dyn ContextSubscriber>) -> bool {
        self.registry.subscribe(topic, subscriber)
    }

    /// Unsubscribe from a topic. See [`Registry::unsubscribe`].
    pub fn unsubscribe(&self, topic: &str, subscriber: &Arc<dyn ContextSubscriber>) -> bool {
        self.registry.unsubscribe(topic, subscriber)
    }

    /// Unsubscribe from every topic. See [`Registry::unsubscribe_all`].
    pub fn unsubscribe_all(&self, subscriber: &Arc<dyn ContextSubscriber>) -> bool {
        self.registry.unsubscribe_all(subscriber)
    }

    /// Topics that currently have at least one live provider.
    pub fn available_topics(&self) -> Vec<String> {
        self.registry.available_topics()
    }

    /// Live providers for a topic.
    pub fn find_providers(&self, topic: &str) -> Vec<Arc<dyn ContextProvider>> {
        self.registry.find_providers(topic)
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Queue a message for asynchronous delivery.
    ///
    /// Returns `false` for an invalid message (empty topic or payload) or
    /// after shutdown was initiated; `true` means the message was accepted,
    /// not that anyone received it. Blocks only for the duration of the
    /// FIFO lock, never for delivery.
    pub fn publish(&self, message: Arc<Message>) -> bool {
        if !message.is_valid() {
            log::debug!(
                "rejecting publish: {}",
                RackbusError::invalid_argument("empty topic or payload")
            );
            return false;
        }
        {
            let mut queue = self.shared.queue.lock();
            if !queue.running {
                log::debug!("rejecting publish: {}", RackbusError::ShutdownInProgress);
                return false;
            }
            queue.fifo.push_back(message);
        }
        self.shared.available.notify_one();
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Protocol major version.
    pub fn version(&self) -> u32 {
        PROTOCOL_VERSION
    }

    /// Snapshot of the dispatch counters.
    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            published: self.stats.published.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            dropped_no_subscriber: self.stats.dropped_no_subscriber.load(Ordering::Relaxed),
            subscriber_faults: self.stats.subscriber_faults.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting messages and join the worker.
    ///
    /// Queued messages are drained first when the broker was built with
    /// `drain_on_shutdown` (the default). Idempotent; later `publish` calls
    /// return `false`.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.queue.lock();
            queue.running = false;
        }
        self.shared.available.notify_all();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    fn worker_loop(
        registry: &Registry,
        shared: &DispatchShared,
        stats: &StatCounters,
        drain_on_shutdown: bool,
    ) {
        loop {
            let message = {
                let mut queue = shared.queue.lock();
                loop {
                    if let Some(message) = queue.fifo.pop_front() {
                        if queue.running || drain_on_shutdown {
                            break Some(message);
                        }
                        // Shutdown without drain: discard the backlog.
                        queue.fifo.clear();
                        break None;
                    }
                    if !queue.running {
                        break None;
                    }
                    shared.available.wait(&mut queue);
                }
            };

            let Some(message) = message else {
                return;
            };
            Self::deliver(registry, stats, &message);
        }
    }

    /// Fan one message out to the current subscribers of its topic.
    fn deliver(registry: &Registry, stats: &StatCounters, message: &Arc<Message>) {
        // Snapshot first, then deliver with no lock held: a callback that
        // subscribes or unsubscribes must not deadlock against delivery.
        let snapshot = registry.live_subscribers(&message.topic);
        if snapshot.is_empty() {
            stats.dropped_no_subscriber.fetch_add(1, Ordering::Relaxed);
            return;
        }

        for subscriber in snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                subscriber.on_message(message);
            }));
            match result {
                Ok(()) => {
                    stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(payload) => {
                    stats.subscriber_faults.fetch_add(1, Ordering::Relaxed);
                    let reason = if let Some(s) = payload.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = payload.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic payload".to_string()
                    };
                    log::error!(
                        "{}",
                        RackbusError::subscriber_fault(&message.topic, reason)
                    );
                }
            }
        }
    }
}

impl Default for ContextBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ContextBroker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Process-wide instance
// ============================================================================

static INSTANCE: Mutex<Option<Arc<ContextBroker>>> = Mutex::new(None);

/// The process-wide broker, created on first access.
pub fn context_broker() -> Arc<ContextBroker> {
    let mut instance = INSTANCE.lock();
    instance
        .get_or_insert_with(|| Arc::new(ContextBroker::new()))
        .clone()
}

/// Tear down the process-wide broker, joining its worker.
///
/// Modules still holding the returned `Arc` keep a functional registry but
/// the dispatch worker is gone; the next [`context_broker`] call creates a
/// fresh instance.
pub fn shutdown_context_broker() {
    let taken = INSTANCE.lock().take();
    if let Some(broker) = taken {
        broker.shutdown();
    }
}
