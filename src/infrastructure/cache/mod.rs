//! # Cache Backends
//!
//! - [`InMemoryCache`]: bounded process-local cache (LRU, LFU or FIFO)
//! - [`RedisCache`]: shared cache for multi-node deployments

pub mod error;
pub mod in_memory;
pub mod redis_cache;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use in_memory::InMemoryCache;
pub use redis_cache::RedisCache;
pub use traits::{CacheBackend, CacheStats, EvictionPolicy};
