//! # Cache Service
//!
//! Tenant-namespaced access to a [`CacheBackend`].
//!
//! Keys are stored as `{namespace}:{tenant}:{key}`, so one tenant can neither
//! read nor clear another tenant's entries. Backend failures never fail a
//! [`CacheService::get_or_compute`] call: the value is computed and the
//! error logged.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::value_objects::TenantId;
use crate::infrastructure::cache::{CacheBackend, CacheStats};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest accepted caller key.
pub const MAX_KEY_LEN: usize = 200;

/// Cache service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheServiceConfig {
    /// Prefix of every stored key.
    pub namespace: String,
    /// TTL applied when a caller gives none; zero keeps entries until evicted.
    pub default_ttl_secs: u64,
}

impl Default for CacheServiceConfig {
    fn default() -> Self {
        Self {
            namespace: "eventos".to_string(),
            default_ttl_secs: 300,
        }
    }
}

/// Tenant-scoped cache operations.
#[derive(Debug, Clone)]
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    config: CacheServiceConfig,
}

impl CacheService {
    /// Creates a cache service.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheServiceConfig) -> Self {
        Self { backend, config }
    }

    fn key(&self, tenant: TenantId, key: &str) -> ApplicationResult<String> {
        if key.is_empty() || key.len() > MAX_KEY_LEN || key.chars().any(char::is_whitespace) {
            return Err(ApplicationError::validation(format!(
                "cache key must be 1..={MAX_KEY_LEN} characters without whitespace"
            )));
        }
        Ok(format!("{}:{tenant}:{key}", self.config.namespace))
    }

    fn tenant_prefix(&self, tenant: TenantId) -> String {
        format!("{}:{tenant}:", self.config.namespace)
    }

    fn ttl(&self, ttl_secs: Option<u64>) -> Option<Duration> {
        match ttl_secs.unwrap_or(self.config.default_ttl_secs) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Returns the live value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` for a malformed key, or an
    /// infrastructure error if the backend fails.
    pub async fn get(&self, tenant: TenantId, key: &str) -> ApplicationResult<Option<serde_json::Value>> {
        let key = self.key(tenant, key)?;
        Ok(self.backend.get(&key).await?)
    }

    /// Stores a value; `ttl_secs` of zero means no expiry.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` for a malformed key, or an
    /// infrastructure error if the backend fails.
    pub async fn set(
        &self,
        tenant: TenantId,
        key: &str,
        value: serde_json::Value,
        ttl_secs: Option<u64>,
    ) -> ApplicationResult<()> {
        let key = self.key(tenant, key)?;
        self.backend.set(&key, value, self.ttl(ttl_secs)).await?;
        Ok(())
    }

    /// Removes one key; returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` for a malformed key, or an
    /// infrastructure error if the backend fails.
    pub async fn delete(&self, tenant: TenantId, key: &str) -> ApplicationResult<bool> {
        let key = self.key(tenant, key)?;
        Ok(self.backend.delete(&key).await?)
    }

    /// Removes every entry of the tenant.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the backend fails.
    pub async fn clear(&self, tenant: TenantId) -> ApplicationResult<u64> {
        let removed = self.backend.clear_prefix(&self.tenant_prefix(tenant)).await?;
        debug!(%tenant, removed, "tenant cache cleared");
        Ok(removed)
    }

    /// Backend counters.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the backend fails.
    pub async fn stats(&self) -> ApplicationResult<CacheStats> {
        Ok(self.backend.stats().await?)
    }

    /// Returns true if the backend answers.
    pub async fn health_check(&self) -> bool {
        self.backend.health_check().await
    }

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// # Errors
    ///
    /// Returns the error of `compute`, or a validation error for a malformed key.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        tenant: TenantId,
        key: &str,
        ttl_secs: Option<u64>,
        compute: F,
    ) -> ApplicationResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApplicationResult<T>>,
    {
        let full_key = self.key(tenant, key)?;
        match self.backend.get(&full_key).await {
            Ok(Some(cached)) => match serde_json::from_value(cached) {
                Ok(value) => return Ok(value),
                Err(e) => warn!(key = %full_key, error = %e, "stale cache entry ignored"),
            },
            Ok(None) => {}
            Err(e) => warn!(key = %full_key, error = %e, "cache read failed"),
        }

        let value = compute().await?;
        match serde_json::to_value(&value) {
            Ok(json) => {
                if let Err(e) = self.backend.set(&full_key, json, self.ttl(ttl_secs)).await {
                    warn!(key = %full_key, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(key = %full_key, error = %e, "value not cacheable"),
        }
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::{EvictionPolicy, InMemoryCache};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn service() -> CacheService {
        CacheService::new(
            Arc::new(InMemoryCache::new(100, EvictionPolicy::Lru)),
            CacheServiceConfig::default(),
        )
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let cache = service();
        let tenant = TenantId::new_v4();
        cache.set(tenant, "event:1", json!({"name": "Show"}), None).await.unwrap();
        assert_eq!(
            cache.get(tenant, "event:1").await.unwrap(),
            Some(json!({"name": "Show"}))
        );
        assert!(cache.delete(tenant, "event:1").await.unwrap());
        assert_eq!(cache.get(tenant, "event:1").await.unwrap(), None);
        assert!(!cache.delete(tenant, "event:1").await.unwrap());
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let cache = service();
        let (a, b) = (TenantId::new_v4(), TenantId::new_v4());
        cache.set(a, "k", json!(1), None).await.unwrap();
        cache.set(b, "k", json!(2), None).await.unwrap();

        assert_eq!(cache.clear(a).await.unwrap(), 1);
        assert_eq!(cache.get(a, "k").await.unwrap(), None);
        assert_eq!(cache.get(b, "k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn malformed_keys_are_rejected() {
        let cache = service();
        let tenant = TenantId::new_v4();
        assert!(cache.get(tenant, "").await.unwrap_err().is_validation());
        assert!(cache.get(tenant, "has space").await.unwrap_err().is_validation());
        let long = "k".repeat(MAX_KEY_LEN + 1);
        assert!(cache.set(tenant, &long, json!(1), None).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn get_or_compute_caches_the_first_result() {
        let cache = service();
        let tenant = TenantId::new_v4();
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let value: u32 = cache
                .get_or_compute(tenant, "dashboard", Some(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().await.unwrap().hits, 2);
    }

    #[tokio::test]
    async fn compute_errors_are_not_cached() {
        let cache = service();
        let tenant = TenantId::new_v4();
        let result: ApplicationResult<u32> = cache
            .get_or_compute(tenant, "k", None, || async {
                Err(ApplicationError::not_found("Event", "x"))
            })
            .await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(cache.get(tenant, "k").await.unwrap(), None);
    }
}
