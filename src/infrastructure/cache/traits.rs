//! # Cache Backend Port
//!
//! The [`CacheBackend`] trait implemented by the in-memory and Redis caches.
//! Values are JSON documents; keys are plain strings already namespaced by
//! the caller.

use crate::infrastructure::cache::error::{CacheError, CacheResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which entry an in-memory cache evicts when it is full.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used.
    #[default]
    Lru,
    /// Least frequently used; ties broken by recency.
    Lfu,
    /// Oldest insertion.
    Fifo,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lru => write!(f, "lru"),
            Self::Lfu => write!(f, "lfu"),
            Self::Fifo => write!(f, "fifo"),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "lfu" => Ok(Self::Lfu),
            "fifo" => Ok(Self::Fifo),
            other => Err(CacheError::backend(format!("unknown eviction policy: {other}"))),
        }
    }
}

/// Counters reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheStats {
    /// Backend name.
    pub backend: String,
    /// Eviction policy, for bounded backends.
    pub policy: Option<EvictionPolicy>,
    /// Live entries.
    pub size: u64,
    /// Maximum entries, for bounded backends.
    pub capacity: Option<u64>,
    /// Successful lookups.
    pub hits: u64,
    /// Failed lookups, expired entries included.
    pub misses: u64,
    /// Entries removed to make room.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    /// Hits over lookups, in percent with two decimals.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.hits as f64 * 100.0 / lookups as f64;
        (rate * 100.0).round() / 100.0
    }
}

/// Port for key/value caches.
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Returns the live value for `key`.
    async fn get(&self, key: &str) -> CacheResult<Option<serde_json::Value>>;

    /// Stores `value`, expiring after `ttl` when given.
    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> CacheResult<()>;

    /// Removes `key`; returns true if it existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Removes every key starting with `prefix`; returns how many.
    async fn clear_prefix(&self, prefix: &str) -> CacheResult<u64>;

    /// Current counters.
    async fn stats(&self) -> CacheResult<CacheStats>;

    /// Returns true if the backend answers.
    async fn health_check(&self) -> bool;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses() {
        assert_eq!("LFU".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lfu);
        assert!("random".parse::<EvictionPolicy>().is_err());
    }

    #[test]
    fn hit_rate_rounds() {
        let stats = CacheStats {
            hits: 2,
            misses: 1,
            ..CacheStats::default()
        };
        assert!((stats.hit_rate() - 66.67).abs() < f64::EPSILON);
        assert!(CacheStats::default().hit_rate().abs() < f64::EPSILON);
    }
}
