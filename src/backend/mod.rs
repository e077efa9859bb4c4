//! Cache tag index implementations.
//!
//! A backend stores opaque payload bytes under string keys, and indexes each
//! entry by the resource tags it depends on so that a mutation can evict every
//! dependent entry with one call.
//!
//! # Tag generations
//!
//! Every tag carries a monotonically increasing generation. `evict_by_tag`
//! bumps it; `set` stamps the entry with the generation the caller observed
//! *before* it read the store. An entry whose stamp is older than its tag's
//! current generation is never served. This is what makes eviction atomic
//! for readers (all entries of the tag become invisible at once) and stops a
//! read that started before a mutation from re-filling the cache with
//! pre-mutation data after the eviction ran.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::{PoolStats, RedisBackend, RedisConfig};

/// A tag plus the generation observed for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TagStamp {
    pub tag: String,
    pub generation: u64,
}

impl TagStamp {
    pub fn new(tag: impl Into<String>, generation: u64) -> Self {
        TagStamp {
            tag: tag.into(),
            generation,
        }
    }
}

/// Trait for cache tag index implementations.
///
/// **IMPORTANT:** All methods use `&self` to allow concurrent access.
/// Implementations use interior mutability (sharded maps) or external storage,
/// and must never hold a lock across an `.await`.
///
/// **ASYNC:** Returned futures are `Send` so the orchestrator can spawn the
/// post-commit eviction onto the runtime.
pub trait CacheBackend: Send + Sync + Clone + 'static {
    /// Retrieve a payload by key.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - Live entry found
    /// - `Ok(None)` - Miss (absent, expired or evicted)
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs (connection lost, etc.)
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store a payload, overwriting any entry at `key`.
    ///
    /// # Arguments
    /// - `key`: Cache key
    /// - `value`: Encoded payload bytes
    /// - `tags`: Tags the entry depends on, with the generations observed
    ///   before the data was read
    /// - `ttl`: Time-to-live. None = no expiry
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        tags: &[TagStamp],
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a single entry.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Evict every entry tagged with `tag` and return how many were removed.
    ///
    /// Idempotent: overlapping calls for the same tag are safe.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn evict_by_tag(&self, tag: &str) -> impl Future<Output = Result<usize>> + Send;

    /// Current generation of `tag` (0 for a tag never evicted).
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn tag_generation(&self, tag: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Health check - verify backend is accessible.
    ///
    /// # Errors
    /// Returns `Err` if backend is not accessible
    fn health_check(&self) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(true) }
    }

    /// Optional: Clear all entries and tag state (use with caution).
    ///
    /// # Errors
    /// Returns `Err` if operation is not implemented or fails
    fn clear_all(&self) -> impl Future<Output = Result<()>> + Send {
        async {
            Err(crate::error::Error::CacheError(
                "clear_all not implemented for this backend".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_health_default() {
        let backend = InMemoryBackend::new();
        assert!(backend
            .health_check()
            .await
            .expect("Failed to check health"));
    }

    #[test]
    fn test_tag_stamp_equality() {
        assert_eq!(TagStamp::new("generos", 2), TagStamp::new("generos", 2));
        assert_ne!(TagStamp::new("generos", 2), TagStamp::new("generos", 3));
    }
}
