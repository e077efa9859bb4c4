//! Observability hooks and TTL policy for cached reads.
//!
//! Two concerns live here:
//!
//! - **Metrics (`CacheMetrics`)**: hits, misses, fills, evictions and
//!   cache-side errors, with timings
//! - **TTL Policies (`TtlPolicy`)**: how long a filled entry stays live
//!
//! # Metrics
//!
//! ```
//! use resource_kit::observability::CacheMetrics;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct CountingMetrics {
//!     hits: AtomicU64,
//! }
//!
//! impl CacheMetrics for CountingMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         self.hits.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//! ```
//!
//! Methods that are not overridden log through the `log` crate.
//! `NoOpMetrics` discards everything and is the orchestrator default.
//!
//! # TTL Policies
//!
//! ```
//! use resource_kit::observability::TtlPolicy;
//! use std::time::Duration;
//!
//! // Same TTL for every resource
//! let _policy = TtlPolicy::Fixed(Duration::from_secs(60));
//!
//! // Different TTL per tag
//! let _policy = TtlPolicy::PerTag(|tag| match tag {
//!     "generos" => Duration::from_secs(300),
//!     _ => Duration::from_secs(60),
//! });
//! ```
//!
//! | Policy | Use Case |
//! |--------|----------|
//! | `Fixed` | Uniform expiry (default: 60 seconds) |
//! | `Infinite` | Rely on tag eviction only |
//! | `PerTag` | Reference data cached longer than hot resources |

use std::time::Duration;

/// Default expiry for cached reads.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache fill after a store read.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a tag eviction.
    fn record_evict(&self, tag: &str, removed: usize, duration: Duration) {
        debug!("Cache EVICT: {} removed {} took {:?}", tag, removed, duration);
    }

    /// Record a cache-side error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_evict(&self, _tag: &str, _removed: usize, _duration: Duration) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// TTL (Time-to-Live) policy for cache entries.
#[derive(Clone, Debug)]
pub enum TtlPolicy {
    /// Fixed duration for all entries
    Fixed(Duration),

    /// No TTL (entries live until their tag is evicted)
    Infinite,

    /// Custom per-tag policy
    PerTag(fn(&str) -> Duration),
}

impl Default for TtlPolicy {
    fn default() -> Self {
        TtlPolicy::Fixed(DEFAULT_TTL)
    }
}

impl TtlPolicy {
    /// Get TTL for a resource tag.
    pub fn get_ttl(&self, tag: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::Infinite => None,
            TtlPolicy::PerTag(f) => Some(f(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_metrics() {
        let metrics = NoOpMetrics;
        metrics.record_hit("key", Duration::from_secs(1));
        metrics.record_miss("key", Duration::from_secs(2));
        metrics.record_evict("tag", 3, Duration::from_millis(1));
    }

    #[test]
    fn test_ttl_policy_default_is_one_minute() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.get_ttl("any"), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_ttl_policy_infinite() {
        assert_eq!(TtlPolicy::Infinite.get_ttl("any"), None);
    }

    #[test]
    fn test_ttl_policy_per_tag() {
        let policy = TtlPolicy::PerTag(|tag| match tag {
            "generos" => Duration::from_secs(3600),
            _ => Duration::from_secs(30),
        });

        assert_eq!(policy.get_ttl("generos"), Some(Duration::from_secs(3600)));
        assert_eq!(policy.get_ttl("cines"), Some(Duration::from_secs(30)));
    }
}
