//! # Redis Cache
//!
//! [`CacheBackend`] over Redis. Values are stored as JSON strings with
//! `SET EX` when a TTL is given. Prefix clears walk the keyspace with
//! `SCAN ... MATCH prefix*` so they never block the server. Hit and miss
//! counters are kept per process.

use crate::infrastructure::cache::error::{CacheError, CacheResult};
use crate::infrastructure::cache::traits::{CacheBackend, CacheStats};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const SCAN_BATCH: usize = 500;

/// Redis-backed cache.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn backend_error(e: redis::RedisError) -> CacheError {
    if e.is_connection_dropped() || e.is_io_error() || e.is_timeout() {
        CacheError::connection(e.to_string())
    } else {
        CacheError::backend(e.to_string())
    }
}

/// Escapes glob metacharacters so a prefix matches literally.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

impl RedisCache {
    /// Connects to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the server is unreachable.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::connection(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::connection(e.to_string()))?;
        Ok(Self {
            conn,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<serde_json::Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.map_err(backend_error)?;
        match raw {
            Some(raw) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(&value)?;
        match ttl.map(|t| t.as_secs().max(1)) {
            Some(secs) => conn.set_ex::<_, _, ()>(key, raw, secs).await,
            None => conn.set::<_, _, ()>(key, raw).await,
        }
        .map_err(backend_error)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await.map_err(backend_error)?;
        Ok(removed > 0)
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut conn = self.conn.clone();
        let pattern = match_pattern(prefix);
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(backend_error)?;
            if !keys.is_empty() {
                let n: u64 = conn.del(&keys).await.map_err(backend_error)?;
                removed += n;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        debug!(prefix, removed, "cleared redis keys");
        Ok(removed)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let mut conn = self.conn.clone();
        let size: u64 = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(CacheStats {
            backend: "redis".to_string(),
            policy: None,
            size,
            capacity: None,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: 0,
            expirations: 0,
        })
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_pattern_is_literal() {
        assert_eq!(match_pattern("t1:cache:"), "t1:cache:*");
        assert_eq!(match_pattern("a*b?"), "a\\*b\\?*");
    }
}
