//! Topic registry: who provides what, who listens to what.
//!
//! Two independent topic-keyed indices (providers and subscribers), each
//! behind its own mutex — the indices share no data, so a register never
//! blocks a subscribe. Every stored handle is weak: the host keeps ownership
//! of its modules and the registry never extends a module's lifetime.
//!
//! Expired handles are invisible to every query and are purged lazily on any
//! visit to their topic's bucket; a bucket that empties takes its topic with
//! it. Duplicate detection compares pointer identity of the referent, not
//! value equality: two handles are "the same" exactly when they point at the
//! same module instance.

use std::collections::HashMap;
use std::ptr;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::RackbusError;
use crate::module::{ContextProvider, ContextSubscriber};

/// True when both handles refer to the same underlying object.
///
/// Compares the data pointers only — `Arc::ptr_eq` on `dyn` trait objects
/// also compares vtable pointers, which can differ for the same object
/// across codegen units.
fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Remove every expired handle from a bucket, and the matching handle if a
/// target is given. Returns whether the target was found.
fn purge_bucket<T: ?Sized>(bucket: &mut Vec<Weak<T>>, target: Option<&Arc<T>>) -> bool {
    let mut found = false;
    bucket.retain(|weak| match weak.upgrade() {
        Some(strong) => {
            if let Some(target) = target {
                if same_object(&strong, target) {
                    found = true;
                    return false;
                }
            }
            true
        }
        None => false,
    });
    found
}

/// Concurrent mapping of topics to weak provider and subscriber handles.
pub struct Registry {
    providers: Mutex<HashMap<String, Vec<Weak<dyn ContextProvider>>>>,
    subscribers: Mutex<HashMap<String, Vec<Weak<dyn ContextSubscriber>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            providers: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Provider index
    // ------------------------------------------------------------------

    /// Register `provider` as offering `topic`.
    ///
    /// Returns `true` on insert; `false` for an empty topic or if the same
    /// provider object is already registered for the topic.
    pub fn register_context(&self, topic: &str, provider: &Arc<dyn ContextProvider>) -> bool {
        if topic.is_empty() {
            return false;
        }
        let mut providers = self.providers.lock();
        let bucket = providers.entry(topic.to_string()).or_default();
        for weak in bucket.iter() {
            if let Some(existing) = weak.upgrade() {
                if same_object(&existing, provider) {
                    log::debug!("{}", RackbusError::Duplicate(topic.to_string()));
                    return false;
                }
            }
        }
        bucket.push(Arc::downgrade(provider));
        true
    }

    /// Remove `provider` from `topic`.
    ///
    /// Returns `true` if the exact handle was present and removed. Expired
    /// entries in the bucket are purged as a side effect; an emptied bucket
    /// removes the topic.
    pub fn unregister_context(&self, topic: &str, provider: &Arc<dyn ContextProvider>) -> bool {
        if topic.is_empty() {
            return false;
        }
        let mut providers = self.providers.lock();
        let Some(bucket) = providers.get_mut(topic) else {
            return false;
        };
        let found = purge_bucket(bucket, Some(provider));
        if bucket.is_empty() {
            providers.remove(topic);
        }
        if !found {
            log::debug!("{}", RackbusError::NotFound(topic.to_string()));
        }
        found
    }

    /// Every topic with at least one live provider. Ordering unspecified.
    ///
    /// Expired entries (and emptied topics) encountered during the walk are
    /// purged.
    pub fn available_topics(&self) -> Vec<String> {
        let mut providers = self.providers.lock();
        providers.retain(|_, bucket| {
            purge_bucket(bucket, None);
            !bucket.is_empty()
        });
        providers.keys().cloned().collect()
    }

    /// Every live provider registered for `topic`, in registration order.
    ///
    /// Expired entries are purged; an emptied bucket removes the topic.
    pub fn find_providers(&self, topic: &str) -> Vec<Arc<dyn ContextProvider>> {
        let mut providers = self.providers.lock();
        let Some(bucket) = providers.get_mut(topic) else {
            return Vec::new();
        };
        let mut live = Vec::with_capacity(bucket.len());
        bucket.retain(|weak| match weak.upgrade() {
            Some(strong) => {
                live.push(strong);
                true
            }
            None => false,
        });
        if bucket.is_empty() {
            providers.remove(topic);
        }
        live
    }

    // ------------------------------------------------------------------
    // Subscriber index
    // ------------------------------------------------------------------

    /// Subscribe `subscriber` to `topic`.
    ///
    /// Returns `true` on insert; `false` for an empty topic or a duplicate.
    pub fn subscribe(&self, topic: &str, subscriber: &Arc<dyn ContextSubscriber>) -> bool {
        if topic.is_empty() {
            return false;
        }
        let mut subscribers = self.subscribers.lock();
        let bucket = subscribers.entry(topic.to_string()).or_default();
        for weak in bucket.iter() {
            if let Some(existing) = weak.upgrade() {
                if same_object(&existing, subscriber) {
                    log::debug!("{}", RackbusError::Duplicate(topic.to_string()));
                    return false;
                }
            }
        }
        bucket.push(Arc::downgrade(subscriber));
        true
    }

    /// Remove `subscriber` from `topic`.
    ///
    /// Returns `true` if the exact handle was present and removed; purges
    /// expired entries and drops the topic if its bucket empties.
    pub fn unsubscribe(&self, topic: &str, subscriber: &Arc<dyn ContextSubscriber>) -> bool {
        if topic.is_empty() {
            return false;
        }
        let mut subscribers = self.subscribers.lock();
        let Some(bucket) = subscribers.get_mut(topic) else {
            return false;
        };
        let found = purge_bucket(bucket, Some(subscriber));
        if bucket.is_empty() {
            subscribers.remove(topic);
        }
        if !found {
            log::debug!("{}", RackbusError::NotFound(topic.to_string()));
        }
        found
    }

    /// Remove `subscriber` from every topic it is subscribed to.
    ///
    /// Returns `true` if at least one topic had the subscriber removed.
    /// Topics emptied by the removal (or by purging expired entries) are
    /// dropped.
    pub fn unsubscribe_all(&self, subscriber: &Arc<dyn ContextSubscriber>) -> bool {
        let mut subscribers = self.subscribers.lock();
        let mut removed_any = false;
        subscribers.retain(|_, bucket| {
            if purge_bucket(bucket, Some(subscriber)) {
                removed_any = true;
            }
            !bucket.is_empty()
        });
        removed_any
    }

    /// Snapshot of every live subscriber for `topic`, in subscription order.
    ///
    /// The dispatcher's delivery walk: upgrades under the lock, purges
    /// expired entries, drops an emptied topic, then releases the lock so
    /// callbacks run with no registry lock held.
    pub fn live_subscribers(&self, topic: &str) -> Vec<Arc<dyn ContextSubscriber>> {
        let mut subscribers = self.subscribers.lock();
        let Some(bucket) = subscribers.get_mut(topic) else {
            return Vec::new();
        };
        let mut live = Vec::with_capacity(bucket.len());
        bucket.retain(|weak| match weak.upgrade() {
            Some(strong) => {
                live.push(strong);
                true
            }
            None => false,
        });
        if bucket.is_empty() {
            subscribers.remove(topic);
        }
        live
    }

    /// Number of topics with at least one (possibly expired) subscriber
    /// entry. Diagnostic helper for tests and monitors.
    pub fn subscribed_topic_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
