//! # In-Memory Cache
//!
//! Bounded process-local cache with LRU, LFU or FIFO eviction and per-entry
//! TTL.
//!
//! Every entry has a rank in an ordered index; the victim is the smallest
//! rank, so lookups, inserts and evictions are all `O(log n)`. A second
//! index ordered by expiry time lets [`InMemoryCache::purge_expired`] drop
//! stale entries without scanning the whole map. Expired entries are also
//! dropped lazily when read.
//!
//! | Policy | Rank |
//! |---|---|
//! | LRU | last access tick |
//! | LFU | (access count, last access tick) |
//! | FIFO | insertion tick |

use crate::infrastructure::cache::error::CacheResult;
use crate::infrastructure::cache::traits::{CacheBackend, CacheStats, EvictionPolicy};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Rank = (u64, u64);

#[derive(Debug)]
struct Entry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
    rank: Rank,
    frequency: u64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    order: BTreeSet<(Rank, String)>,
    expiry: BTreeSet<(Instant, String)>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn detach(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&(entry.rank, key.to_string()));
        if let Some(at) = entry.expires_at {
            self.expiry.remove(&(at, key.to_string()));
        }
        Some(entry)
    }

    fn rerank(&mut self, key: &str, policy: EvictionPolicy) {
        if policy == EvictionPolicy::Fifo {
            return;
        }
        let tick = self.next_tick();
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        let old = entry.rank;
        entry.frequency += 1;
        entry.rank = match policy {
            EvictionPolicy::Lfu => (entry.frequency, tick),
            EvictionPolicy::Lru | EvictionPolicy::Fifo => (tick, 0),
        };
        let new = entry.rank;
        self.order.remove(&(old, key.to_string()));
        self.order.insert((new, key.to_string()));
    }

    fn purge_expired(&mut self, now: Instant) -> u64 {
        let mut purged = 0;
        while let Some((at, key)) = self.expiry.first().cloned() {
            if at > now {
                break;
            }
            self.detach(&key);
            purged += 1;
        }
        self.expirations += purged;
        purged
    }

    fn evict_one(&mut self) -> Option<String> {
        let (_, key) = self.order.first().cloned()?;
        self.detach(&key);
        self.evictions += 1;
        Some(key)
    }
}

/// Bounded in-process cache.
///
/// # Examples
///
/// ```
/// use eventos::infrastructure::cache::{EvictionPolicy, InMemoryCache};
///
/// let cache = InMemoryCache::new(2, EvictionPolicy::Lru);
/// cache.insert("a", serde_json::json!(1), None);
/// cache.insert("b", serde_json::json!(2), None);
/// cache.lookup("a");
/// cache.insert("c", serde_json::json!(3), None);
/// assert!(cache.lookup("b").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    inner: Arc<Mutex<Inner>>,
    capacity: usize,
    policy: EvictionPolicy,
}

impl InMemoryCache {
    /// Creates an empty cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            capacity,
            policy,
        }
    }

    /// Eviction policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Maximum number of entries.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries, expired ones not yet purged included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the live value for `key`, counting a hit or a miss.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let Some(expired) = inner.entries.get(key).map(|e| e.is_expired(now)) else {
            inner.misses += 1;
            return None;
        };
        if expired {
            inner.detach(key);
            inner.expirations += 1;
            inner.misses += 1;
            return None;
        }
        inner.hits += 1;
        inner.rerank(key, self.policy);
        inner.entries.get(key).map(|e| e.value.clone())
    }

    /// Stores `value`, evicting the lowest-ranked entry when full.
    ///
    /// Returns the evicted key, if any.
    pub fn insert(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);

        let previous = inner.detach(key);
        let evicted = if previous.is_none() && inner.entries.len() >= self.capacity {
            inner.evict_one()
        } else {
            None
        };

        let tick = inner.next_tick();
        let frequency = previous.map_or(1, |p| p.frequency + 1);
        let rank = match self.policy {
            EvictionPolicy::Lfu => (frequency, tick),
            EvictionPolicy::Lru | EvictionPolicy::Fifo => (tick, 0),
        };
        let expires_at = ttl.and_then(|t| now.checked_add(t));
        if let Some(at) = expires_at {
            inner.expiry.insert((at, key.to_string()));
        }
        inner.order.insert((rank, key.to_string()));
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at,
                rank,
                frequency,
            },
        );
        evicted
    }

    /// Removes `key`; returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().detach(key).is_some()
    }

    /// Removes every key starting with `prefix`.
    pub fn remove_prefix(&self, prefix: &str) -> u64 {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            inner.detach(key);
        }
        keys.len() as u64
    }

    /// Drops every entry whose TTL has elapsed; returns how many.
    pub fn purge_expired(&self) -> u64 {
        self.inner.lock().purge_expired(Instant::now())
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            backend: "memory".to_string(),
            policy: Some(self.policy),
            size: inner.entries.len() as u64,
            capacity: Some(self.capacity as u64),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<serde_json::Value>> {
        Ok(self.lookup(key))
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.insert(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.remove(key))
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<u64> {
        Ok(self.remove_prefix(prefix))
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        Ok(self.snapshot())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
