//! In-memory cache tag index (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding, for
//! both the entries and the per-tag state. Unrelated tags never contend on the
//! same lock. Expired and stale entries are reclaimed lazily on access, and a
//! reclaimed key leaves its tags' key sets with it.
//!
//! Lock order is always `tags` before `store`.

use super::{CacheBackend, TagStamp};
use crate::error::Result;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

/// In-memory cache entry with tag stamps and optional expiration.
struct CacheEntry {
    data: Vec<u8>,
    stamps: Vec<TagStamp>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: Vec<u8>, stamps: Vec<TagStamp>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        CacheEntry {
            data,
            stamps,
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }

    /// Tagged with `tag` at a generation older than `generation`.
    fn predates(&self, tag: &str, generation: u64) -> bool {
        self.stamps
            .iter()
            .any(|s| s.tag == tag && s.generation < generation)
    }
}

/// Per-tag state: current generation plus the keys registered under it.
#[derive(Default)]
struct TagState {
    generation: u64,
    keys: HashSet<String>,
}

enum Lookup {
    Missing,
    Expired(Vec<TagStamp>),
    Live(Vec<u8>, Vec<TagStamp>),
}

/// Thread-safe async in-memory cache tag index.
///
/// No async locks required - operations are non-blocking and no map guard is
/// held across two maps at once.
///
/// # Example
///
/// ```no_run
/// use resource_kit::backend::{CacheBackend, InMemoryBackend, TagStamp};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///
///     let generation = backend.tag_generation("generos").await?;
///     let tags = [TagStamp::new("generos", generation)];
///     backend
///         .set("generos:id:1", b"payload".to_vec(), &tags, Some(Duration::from_secs(60)))
///         .await?;
///     assert!(backend.get("generos:id:1").await?.is_some());
///
///     backend.evict_by_tag("generos").await?;
///     assert!(backend.get("generos:id:1").await?.is_none());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, CacheEntry>>,
    tags: Arc<DashMap<String, TagState>>,
}

impl InMemoryBackend {
    /// Create a new in-memory backend (empty at startup).
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
            tags: Arc::new(DashMap::new()),
        }
    }

    /// Get the current number of entries (including not yet reclaimed ones).
    pub async fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Remove every expired entry now instead of waiting for the next access.
    ///
    /// Returns the number of entries reclaimed.
    pub async fn purge_expired(&self) -> usize {
        let expired: Vec<(String, Vec<TagStamp>)> = self
            .store
            .iter()
            .filter(|entry| entry.is_expired())
            .map(|entry| (entry.key().clone(), entry.stamps.clone()))
            .collect();

        let purged = expired
            .iter()
            .filter(|(key, stamps)| {
                let removed = self
                    .store
                    .remove_if(key.as_str(), |_, entry| entry.is_expired())
                    .is_some();
                if removed {
                    self.forget(key, stamps);
                }
                removed
            })
            .count();

        if purged > 0 {
            debug!("✓ InMemory PURGE {} expired entries", purged);
        }
        purged
    }

    /// Get memory statistics.
    pub async fn stats(&self) -> CacheStats {
        let total_bytes: usize = self.store.iter().map(|entry| entry.data.len()).sum();
        let expired_count = self.store.iter().filter(|entry| entry.is_expired()).count();

        CacheStats {
            total_entries: self.store.len(),
            expired_entries: expired_count,
            total_bytes,
            tracked_tags: self.tags.len(),
            tracked_keys: self.tags.iter().map(|state| state.keys.len()).sum(),
        }
    }

    /// Print cache statistics to debug log.
    pub async fn log_stats(&self) {
        let stats = self.stats().await;
        debug!(
            "Cache Stats: {} entries ({} expired), {} bytes, {} tags, {} tagged keys",
            stats.total_entries,
            stats.expired_entries,
            stats.total_bytes,
            stats.tracked_tags,
            stats.tracked_keys
        );
    }

    /// Drop `key` from the key set of every stamped tag, unless a newer fill
    /// already put it back in the store.
    fn forget(&self, key: &str, stamps: &[TagStamp]) {
        for stamp in stamps {
            if let Some(mut state) = self.tags.get_mut(&stamp.tag) {
                if !self.store.contains_key(key) {
                    state.keys.remove(key);
                }
            }
        }
    }

    fn current_generation(&self, tag: &str) -> u64 {
        self.tags.get(tag).map(|state| state.generation).unwrap_or(0)
    }

    fn first_stale<'a>(&self, stamps: &'a [TagStamp]) -> Option<&'a TagStamp> {
        stamps
            .iter()
            .find(|s| s.generation != self.current_generation(&s.tag))
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let lookup = match self.store.get(key) {
            None => Lookup::Missing,
            Some(entry) if entry.is_expired() => Lookup::Expired(entry.stamps.clone()),
            Some(entry) => Lookup::Live(entry.data.clone(), entry.stamps.clone()),
        };

        match lookup {
            Lookup::Missing => {
                debug!("✓ InMemory GET {} -> MISS", key);
                Ok(None)
            }
            Lookup::Expired(stamps) => {
                if self
                    .store
                    .remove_if(key, |_, entry| entry.is_expired())
                    .is_some()
                {
                    self.forget(key, &stamps);
                }
                debug!("✓ InMemory GET {} -> MISS (expired)", key);
                Ok(None)
            }
            Lookup::Live(data, stamps) => {
                if let Some(stale) = self.first_stale(&stamps) {
                    // Only drop the entry we looked at; a newer fill may already have replaced it.
                    if self
                        .store
                        .remove_if(key, |_, entry| entry.stamps == stamps)
                        .is_some()
                    {
                        self.forget(key, &stamps);
                    }
                    debug!("✓ InMemory GET {} -> MISS (stale tag {})", key, stale.tag);
                    return Ok(None);
                }
                debug!("✓ InMemory GET {} -> HIT", key);
                Ok(Some(data))
            }
        }
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        tags: &[TagStamp],
        ttl: Option<Duration>,
    ) -> Result<()> {
        if let Some(stale) = tags
            .iter()
            .find(|s| s.generation < self.current_generation(&s.tag))
        {
            debug!(
                "✓ InMemory SET {} discarded (tag {} evicted since read)",
                key, stale.tag
            );
            return Ok(());
        }

        self.store
            .insert(key.to_string(), CacheEntry::new(value, tags.to_vec(), ttl));
        for stamp in tags {
            self.tags
                .entry(stamp.tag.clone())
                .or_default()
                .keys
                .insert(key.to_string());
        }

        if let Some(d) = ttl {
            debug!("✓ InMemory SET {} (TTL: {:?}, tags: {})", key, d, tags.len());
        } else {
            debug!("✓ InMemory SET {} (tags: {})", key, tags.len());
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if let Some((_, entry)) = self.store.remove(key) {
            self.forget(key, &entry.stamps);
        }
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn evict_by_tag(&self, tag: &str) -> Result<usize> {
        // Bump first: from here on every entry of this tag is invisible to `get`.
        let (generation, keys) = {
            let mut state = self.tags.entry(tag.to_string()).or_default();
            state.generation += 1;
            let keys: Vec<String> = state.keys.drain().collect();
            (state.generation, keys)
        };

        let removed = keys
            .iter()
            .filter(|key| {
                self.store
                    .remove_if(key.as_str(), |_, entry| entry.predates(tag, generation))
                    .is_some()
            })
            .count();

        debug!(
            "✓ InMemory EVICT tag {} -> {} entries (generation {})",
            tag, removed, generation
        );
        Ok(removed)
    }

    async fn tag_generation(&self, tag: &str) -> Result<u64> {
        Ok(self.current_generation(tag))
    }

    async fn health_check(&self) -> Result<bool> {
        // In-memory backend is always healthy
        Ok(true)
    }

    async fn clear_all(&self) -> Result<()> {
        // Keep generations monotonic so in-flight fills stay stale.
        for mut state in self.tags.iter_mut() {
            state.generation += 1;
            state.keys.clear();
        }
        self.store.clear();
        warn!("⚠ InMemory CLEAR_ALL executed - all cache cleared!");
        Ok(())
    }
}

/// Cache statistics.
#[derive(Clone, Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub total_bytes: usize,
    pub tracked_tags: usize,
    pub tracked_keys: usize,
}
