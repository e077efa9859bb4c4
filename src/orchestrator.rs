//! Generic CRUD orchestrator - main entry point for resource operations.
//!
//! One orchestrator serves one resource. It owns the descriptor, the
//! projection, the store handle and the cache backend, and implements the six
//! operations every resource exposes:
//!
//! | Operation | Cache | Store |
//! |-----------|-------|-------|
//! | `list` | read-through, key per normalized page | `count` + `fetch_page` concurrently |
//! | `list_all` | read-through, one key | `fetch_all` |
//! | `get` | read-through, key per id | `fetch_by_id` |
//! | `create` | evict tag after commit | `create` |
//! | `replace` | evict tag after commit | `replace` |
//! | `delete` | evict tag after commit | `delete_by_id` |
//!
//! A mutation returns only after the store confirmed the write *and* the
//! resource's tag was evicted. The write and its eviction run together on
//! their own task: dropping the caller's future never separates a committed
//! write from its eviction, and an eviction never runs for a write that did
//! not commit.
//!
//! Cache failures never fail a request: reads fall through to the store, fills
//! are dropped, and a failed eviction is logged at error level and counted.

use crate::backend::{CacheBackend, TagStamp};
use crate::config::ServeConfig;
use crate::descriptor::ResourceDescriptor;
use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::pagination::{Page, PageRequest};
use crate::projection::Projection;
use crate::record::{Id, Record};
use crate::serialization::{decode_payload, encode_payload};
use crate::store::EntityStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a successful create.
#[derive(Clone, Debug, PartialEq)]
pub struct Created<O> {
    /// Store-assigned identifier.
    pub id: Id,
    /// Location reference built from the descriptor's route template.
    pub location: String,
    /// Response shape of the persisted record.
    pub body: O,
}

/// Generic CRUD orchestrator.
///
/// # Example
///
/// ```
/// use resource_kit::backend::InMemoryBackend;
/// use resource_kit::descriptor::{ResourceDescriptor, SortKey};
/// use resource_kit::orchestrator::CrudOrchestrator;
/// use resource_kit::pagination::PageRequest;
/// use resource_kit::projection::IdentityProjection;
/// use resource_kit::record::{Id, Record};
/// use resource_kit::store::InMemoryStore;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Genre { id: Id, name: String }
///
/// impl Record for Genre {
///     fn id(&self) -> Id { self.id }
///     fn set_id(&mut self, id: Id) { self.id = id; }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> resource_kit::Result<()> {
/// let genres = CrudOrchestrator::new(
///     ResourceDescriptor::new("generos", "/api/generos/{id}", SortKey::by_key("name", |g: &Genre| g.name.clone())),
///     IdentityProjection,
///     InMemoryStore::new(),
///     InMemoryBackend::new(),
/// );
///
/// let created = genres.create(Genre { id: 0, name: "Comedia".to_string() }).await?;
/// assert_eq!(created.location, "/api/generos/1");
///
/// let page = genres.list(PageRequest::new(1, 10)).await?;
/// assert_eq!(page.total_count, 1);
/// # Ok(())
/// # }
/// ```
pub struct CrudOrchestrator<T, P, S, B>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    descriptor: ResourceDescriptor<T>,
    projection: P,
    store: Arc<S>,
    backend: B,
    config: ServeConfig,
    metrics: Arc<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
}

impl<T, P, S, B> CrudOrchestrator<T, P, S, B>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    /// Create an orchestrator with the default [`ServeConfig`].
    pub fn new(descriptor: ResourceDescriptor<T>, projection: P, store: S, backend: B) -> Self {
        let config = ServeConfig::default();
        CrudOrchestrator {
            descriptor,
            projection,
            store: Arc::new(store),
            backend,
            ttl_policy: config.ttl_policy(),
            config,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Use process-wide settings. Also resets the TTL policy to the config's.
    pub fn with_config(mut self, config: ServeConfig) -> Self {
        self.ttl_policy = config.ttl_policy();
        self.config = config;
        self
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = Arc::from(metrics);
        self
    }

    /// Set custom TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    pub fn descriptor(&self) -> &ResourceDescriptor<T> {
        &self.descriptor
    }

    pub fn config(&self) -> &ServeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One page of the resource, ordered by the descriptor's sort key.
    ///
    /// Page and page size are clamped, never rejected. The total count comes
    /// from a separate query issued concurrently with the page query.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreError` if either store query fails.
    pub async fn list(&self, request: PageRequest) -> Result<Page<P::Output>> {
        let normalized =
            request.normalize(self.config.default_page_size, self.config.max_page_size);
        let key = CacheKeyBuilder::page(
            self.descriptor.tag(),
            normalized.page,
            normalized.records_per_page,
        );
        let slice = normalized.slice;

        self.read_through(key, async {
            let sort = self.descriptor.sort_key();
            let (total_count, records) = futures::try_join!(
                self.store.count(None),
                self.store.fetch_page(sort, slice.skip, slice.take)
            )?;

            Ok(Page {
                items: records
                    .iter()
                    .map(|record| self.projection.to_response(record))
                    .collect(),
                total_count,
            })
        })
        .await
    }

    /// Every record of the resource, ordered by the descriptor's sort key.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreError` if the store query fails.
    pub async fn list_all(&self) -> Result<Vec<P::Output>> {
        let key = CacheKeyBuilder::all(self.descriptor.tag());

        self.read_through(key, async {
            let records = self.store.fetch_all(self.descriptor.sort_key()).await?;
            Ok(records
                .iter()
                .map(|record| self.projection.to_response(record))
                .collect())
        })
        .await
    }

    /// A single record by identifier.
    ///
    /// Absence is cached like any other read; the next mutation of the
    /// resource evicts it.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if no record has this identifier
    /// - `Error::StoreError` if the store query fails
    pub async fn get(&self, id: Id) -> Result<P::Output> {
        let key = CacheKeyBuilder::by_id(self.descriptor.tag(), id);

        let found: Option<P::Output> = self
            .read_through(key, async {
                let record = self.store.fetch_by_id(id).await?;
                Ok(record.map(|r| self.projection.to_response(&r)))
            })
            .await?;

        found.ok_or_else(|| Error::not_found(self.descriptor.name(), id))
    }

    /// Validate, persist and return a new record.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError` if the projection rejects the input (nothing
    ///   is written and nothing is evicted)
    /// - `Error::StoreError` if the store rejects the write (no eviction)
    pub async fn create(&self, input: P::Input) -> Result<Created<P::Output>> {
        self.projection.validate(&input)?;
        let record = self.projection.to_record(input);

        let store = Arc::clone(&self.store);
        let (created, _) = self
            .commit("CREATE", async move {
                let created = store.create(record).await?;
                Ok::<_, Error>((created, true))
            })
            .await?;
        let id = created.id();

        info!("✓ {} CREATE id {}", self.descriptor.name(), id);
        Ok(Created {
            id,
            location: self.descriptor.location(id),
            body: self.projection.to_response(&created),
        })
    }

    /// Replace the record with identifier `id`.
    ///
    /// The identifier from the path always wins over anything in the input.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError` if the projection rejects the input
    /// - `Error::NotFound` if no record has this identifier (no eviction)
    /// - `Error::StoreError` if the store rejects the write (no eviction)
    pub async fn replace(&self, id: Id, input: P::Input) -> Result<()> {
        self.projection.validate(&input)?;
        let mut record = self.projection.to_record(input);
        record.set_id(id);

        let store = Arc::clone(&self.store);
        let ((), replaced) = self
            .commit("REPLACE", async move {
                let replaced = store.replace(id, record).await?;
                Ok::<_, Error>(((), replaced))
            })
            .await?;
        if !replaced {
            return Err(Error::not_found(self.descriptor.name(), id));
        }

        info!("✓ {} REPLACE id {}", self.descriptor.name(), id);
        Ok(())
    }

    /// Delete the record with identifier `id`.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if no record was deleted (no eviction)
    /// - `Error::StoreError` if the store rejects the delete (no eviction)
    pub async fn delete(&self, id: Id) -> Result<()> {
        let store = Arc::clone(&self.store);
        let ((), removed) = self
            .commit("DELETE", async move {
                let removed = store.delete_by_id(id).await?;
                Ok::<_, Error>(((), removed > 0))
            })
            .await?;
        if !removed {
            return Err(Error::not_found(self.descriptor.name(), id));
        }

        info!("✓ {} DELETE id {}", self.descriptor.name(), id);
        Ok(())
    }

    // ========================================================================
    // Cache plumbing
    // ========================================================================

    /// Serve `key` from the cache, or run `load` against the store and fill.
    async fn read_through<V, F>(&self, key: String, load: F) -> Result<V>
    where
        V: Serialize + DeserializeOwned,
        F: Future<Output = Result<V>>,
    {
        let start = Instant::now();

        match self.backend.get(&key).await {
            Ok(Some(bytes)) => match decode_payload::<V>(&bytes) {
                Ok(value) => {
                    self.metrics.record_hit(&key, start.elapsed());
                    return Ok(value);
                }
                Err(e) => {
                    warn!("⚠ Dropping unreadable cache entry {}: {}", key, e);
                    self.metrics.record_error(&key, &e.to_string());
                    if let Err(e) = self.backend.delete(&key).await {
                        warn!("⚠ Failed to delete cache entry {}: {}", key, e);
                    }
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!("⚠ Cache read failed for {}, using store: {}", key, e);
                self.metrics.record_error(&key, &e.to_string());
            }
        }
        self.metrics.record_miss(&key, start.elapsed());

        // Observe the generation before reading the store so a concurrent
        // eviction turns this fill into a no-op.
        let generation = match self.backend.tag_generation(self.descriptor.tag()).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                warn!("⚠ Cache generation unavailable for {}: {}", key, e);
                self.metrics.record_error(&key, &e.to_string());
                None
            }
        };

        let value = load.await.map_err(Error::into_store_error)?;

        if let Some(generation) = generation {
            self.fill(&key, &value, generation).await;
        }

        Ok(value)
    }

    async fn fill<V: Serialize>(&self, key: &str, value: &V, generation: u64) {
        let start = Instant::now();

        let bytes = match encode_payload(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                return;
            }
        };

        let stamps = [TagStamp::new(self.descriptor.tag(), generation)];
        match self.backend.set(key, bytes, &stamps, self.ttl()).await {
            Ok(()) => self.metrics.record_set(key, start.elapsed()),
            Err(e) => {
                warn!("⚠ Cache fill failed for {}: {}", key, e);
                self.metrics.record_error(key, &e.to_string());
            }
        }
    }

    /// Descriptor override, then per-tag config, then the TTL policy.
    fn ttl(&self) -> Option<Duration> {
        let tag = self.descriptor.tag();
        if let Some(ttl) = self.descriptor.ttl() {
            return Some(ttl);
        }
        match self.config.tag_ttl(tag) {
            Some(policy) => policy.get_ttl(tag),
            None => self.ttl_policy.get_ttl(tag),
        }
    }

    /// Run `write` and, when it reports a commit, the tag eviction on one
    /// spawned task. The caller awaits the task but cannot abort it.
    async fn commit<V, W>(&self, operation: &'static str, write: W) -> Result<(V, bool)>
    where
        V: Send + 'static,
        W: Future<Output = Result<(V, bool)>> + Send + 'static,
    {
        let eviction = Eviction {
            backend: self.backend.clone(),
            tag: self.descriptor.tag().to_string(),
            resource: self.descriptor.name().to_string(),
            metrics: Arc::clone(&self.metrics),
        };

        tokio::spawn(async move {
            let (value, committed) = write.await.map_err(Error::into_store_error)?;
            if committed {
                eviction.run(operation).await;
            }
            Ok::<_, Error>((value, committed))
        })
        .await?
    }
}

/// Everything a detached eviction needs, owned.
struct Eviction<B> {
    backend: B,
    tag: String,
    resource: String,
    metrics: Arc<dyn CacheMetrics>,
}

impl<B: CacheBackend> Eviction<B> {
    async fn run(self, operation: &str) {
        let start = Instant::now();

        match self.backend.evict_by_tag(&self.tag).await {
            Ok(removed) => {
                self.metrics.record_evict(&self.tag, removed, start.elapsed());
                debug!(
                    "✓ {} {} evicted {} entries tagged {}",
                    self.resource, operation, removed, self.tag
                );
            }
            Err(e) => {
                self.metrics.record_error(&self.tag, &e.to_string());
                error!(
                    "Eviction of tag {} after committed {} failed, entries may be stale until they expire: {}",
                    self.tag, operation, e
                );
            }
        }
    }
}
