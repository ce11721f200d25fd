//! Cache-aside loading with per-key single flight.
//!
//! A [`CacheAsideLoader`] owns one cache namespace. Reads go through
//! [`CacheAsideLoader::get_or_compute`]: a hit returns the stored clone, a miss
//! runs the producer once per key no matter how many tasks ask concurrently,
//! and a failed producer leaves nothing behind. [`CacheAsideLoader::remove`]
//! also fences off computations that were already running when it was called,
//! so a value read before an invalidation can never be stored after it.

use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::loader";

const METRIC_CACHE_HIT: &str = "discuss_cache_hit_total";
const METRIC_CACHE_MISS: &str = "discuss_cache_miss_total";
const METRIC_CACHE_EVICT: &str = "discuss_cache_evict_total";
const METRIC_CACHE_REMOVE: &str = "discuss_cache_remove_total";

struct CachedValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CachedValue<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-flight coordination for one key.
#[derive(Default)]
struct Slot {
    gate: tokio::sync::Mutex<()>,
    /// Advanced by `remove`; a computation stores its value only if the
    /// generation it observed before running is still current.
    generation: AtomicU64,
}

/// Holds a slot for the duration of one `get_or_compute` call and drops it
/// from the map once nobody else is using it.
struct SlotLease<'a, K: Eq + Hash> {
    key: &'a K,
    slot: Arc<Slot>,
    slots: &'a DashMap<K, Arc<Slot>>,
}

impl<K: Eq + Hash> Drop for SlotLease<'_, K> {
    fn drop(&mut self) {
        let slot = &self.slot;
        // One reference lives in the map and one in this lease.
        self.slots.remove_if(self.key, |_, current| {
            Arc::ptr_eq(current, slot) && Arc::strong_count(current) == 2
        });
    }
}

pub struct CacheAsideLoader<K, V> {
    namespace: &'static str,
    entries: Mutex<LruCache<K, CachedValue<V>>>,
    slots: DashMap<K, Arc<Slot>>,
    ttl: Option<Duration>,
}

impl<K, V> CacheAsideLoader<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(namespace: &'static str, capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        Self {
            namespace,
            entries: Mutex::new(LruCache::new(capacity)),
            slots: DashMap::new(),
            ttl,
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// Concurrent callers for the same key wait for the first computation and
    /// then re-check the cache. When the producer fails the error is returned
    /// to that caller only; waiters retry with their own producer.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup(&key) {
            self.record_hit(&key);
            return Ok(value);
        }

        let lease = self.lease(&key);
        let _gate = lease.slot.gate.lock().await;

        if let Some(value) = self.lookup(&key) {
            self.record_hit(&key);
            return Ok(value);
        }

        counter!(METRIC_CACHE_MISS, "namespace" => self.namespace).increment(1);
        trace!(namespace = self.namespace, key = %key, "cache miss");

        let generation = lease.slot.generation.load(Ordering::Acquire);
        let value = producer().await?;

        let mut entries = mutex_lock(&self.entries, SOURCE, "get_or_compute.store");
        if lease.slot.generation.load(Ordering::Acquire) != generation {
            debug!(
                namespace = self.namespace,
                key = %key,
                "Discarding value computed before removal"
            );
            return Ok(value);
        }

        let entry = CachedValue {
            value: value.clone(),
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        };
        let displaced = entries.push(key.clone(), entry);
        if displaced.is_some_and(|(evicted, _)| evicted != key) {
            counter!(METRIC_CACHE_EVICT, "namespace" => self.namespace, "reason" => "capacity")
                .increment(1);
        }

        Ok(value)
    }

    /// Drop the entry for `key`. Computations already running for this key
    /// will not store their result.
    pub fn remove(&self, key: &K) {
        let mut entries = mutex_lock(&self.entries, SOURCE, "remove");
        let existed = entries.pop(key).is_some();
        if let Some(slot) = self.slots.get(key) {
            slot.generation.fetch_add(1, Ordering::AcqRel);
        }
        drop(entries);

        counter!(METRIC_CACHE_REMOVE, "namespace" => self.namespace).increment(1);
        debug!(namespace = self.namespace, key = %key, existed, "cache entry removed");
    }

    /// Whether a live entry is stored for `key`. Does not touch recency.
    pub fn contains(&self, key: &K) -> bool {
        let entries = mutex_lock(&self.entries, SOURCE, "contains");
        entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "lookup");
        let entry = entries.get(key)?;
        if !entry.is_expired(Instant::now()) {
            return Some(entry.value.clone());
        }

        entries.pop(key);
        counter!(METRIC_CACHE_EVICT, "namespace" => self.namespace, "reason" => "expired")
            .increment(1);
        None
    }

    fn lease<'a>(&'a self, key: &'a K) -> SlotLease<'a, K> {
        let slot = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::default()))
            .clone();
        SlotLease {
            key,
            slot,
            slots: &self.slots,
        }
    }

    fn record_hit(&self, key: &K) {
        counter!(METRIC_CACHE_HIT, "namespace" => self.namespace).increment(1);
        trace!(namespace = self.namespace, key = %key, "cache hit");
    }
}
