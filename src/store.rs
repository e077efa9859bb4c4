//! Entity store gateway: the contract the orchestrator needs from persistence.
//!
//! The `EntityStore` trait decouples the orchestrator from any particular
//! database. Implement it over SQLx, tokio-postgres, an ORM or a remote
//! service; the orchestrator only relies on the semantics below.
//!
//! # Contract
//!
//! - Every operation either fully commits or fails with `Error::StoreError`
//!   and leaves no persisted effect.
//! - `create` assigns a fresh identifier that is never reused.
//! - `replace` returns `false` when no record has the identifier.
//! - `delete_by_id` returns the number of records removed (0 or 1).
//! - Concurrent writers get "last write wins" unless the store reports a
//!   conflict as `StoreError`.
//!
//! # Mocking for Tests
//!
//! [`InMemoryStore`] is a concurrency-safe implementation suitable for unit
//! tests and demos:
//!
//! ```
//! use resource_kit::store::{EntityStore, InMemoryStore};
//! use resource_kit::record::{Id, Record, UNASSIGNED_ID};
//!
//! #[derive(Clone)]
//! struct Genre { id: Id, name: String }
//!
//! impl Record for Genre {
//!     fn id(&self) -> Id { self.id }
//!     fn set_id(&mut self, id: Id) { self.id = id; }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> resource_kit::Result<()> {
//! let store = InMemoryStore::new();
//! let created = store
//!     .create(Genre { id: UNASSIGNED_ID, name: "Comedia".to_string() })
//!     .await?;
//! assert_eq!(created.id, 1);
//! assert!(store.fetch_by_id(1).await?.is_some());
//! # Ok(())
//! # }
//! ```

use crate::descriptor::{Filter, SortKey};
use crate::error::{Error, Result};
use crate::record::{Id, Record};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Trait for entity store implementations.
///
/// All methods take `&self`; implementations use interior mutability or an
/// external connection pool. Returned futures are `Send` so the orchestrator
/// can run on a multi-threaded runtime.
pub trait EntityStore<T: Record>: Send + Sync + 'static {
    /// All records, ascending by `sort`.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    fn fetch_all(&self, sort: &SortKey<T>) -> impl Future<Output = Result<Vec<T>>> + Send;

    /// At most `take` records after skipping `skip`, ascending by `sort`.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    fn fetch_page(
        &self,
        sort: &SortKey<T>,
        skip: u64,
        take: u64,
    ) -> impl Future<Output = Result<Vec<T>>> + Send;

    /// Count records matching `filter`, or all records when `None`.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    fn count(&self, filter: Option<&Filter<T>>) -> impl Future<Output = Result<u64>> + Send;

    /// Point lookup.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - Record found
    /// - `Ok(None)` - No record with that identifier (not an error)
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    fn fetch_by_id(&self, id: Id) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Existence check (optional optimization).
    ///
    /// Default implementation calls `fetch_by_id()`.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    fn exists(&self, id: Id) -> impl Future<Output = Result<bool>> + Send {
        async move { Ok(self.fetch_by_id(id).await?.is_some()) }
    }

    /// Persist a new record and return it with its assigned identifier.
    ///
    /// # Errors
    /// Returns `Err(Error::StoreError)` on constraint violation or store failure
    fn create(&self, record: T) -> impl Future<Output = Result<T>> + Send;

    /// Replace the record with identifier `id`.
    ///
    /// # Returns
    /// - `Ok(true)` - Record replaced
    /// - `Ok(false)` - No record with that identifier
    ///
    /// # Errors
    /// Returns `Err` on lower-level failure
    fn replace(&self, id: Id, record: T) -> impl Future<Output = Result<bool>> + Send;

    /// Delete by identifier and return the number of records removed.
    ///
    /// # Errors
    /// Returns `Err` on lower-level failure
    fn delete_by_id(&self, id: Id) -> impl Future<Output = Result<u64>> + Send;
}

// ============================================================================
// In-Memory Store
// ============================================================================

type UniqueKeyFn<T> = dyn Fn(&T) -> String + Send + Sync;

/// Concurrency-safe in-memory store.
///
/// Records live in a `DashMap` keyed by identifier; identifiers come from an
/// atomic counter starting at 1. An optional uniqueness constraint makes
/// `create` and `replace` fail with `StoreError` on duplicates, which is how
/// tests exercise the store-failure path. Unique values are claimed in a
/// second map before the record is written, so two concurrent writers of the
/// same value cannot both commit.
///
/// Lock order is always `claims` before `records`.
///
/// Clones share the same underlying data.
pub struct InMemoryStore<T: Record> {
    records: Arc<DashMap<Id, T>>,
    claims: Arc<DashMap<String, Id>>,
    next_id: Arc<AtomicI64>,
    unique: Option<(&'static str, Arc<UniqueKeyFn<T>>)>,
}

impl<T: Record> InMemoryStore<T> {
    /// Create a new empty store.
    pub fn new() -> Self {
        InMemoryStore {
            records: Arc::new(DashMap::new()),
            claims: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
            unique: None,
        }
    }

    /// Enforce uniqueness of the value extracted by `key`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = InMemoryStore::new().with_unique("name", |g: &Genre| g.name.to_lowercase());
    /// ```
    pub fn with_unique<F>(mut self, constraint: &'static str, key: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.unique = Some((constraint, Arc::new(key)));
        self
    }

    /// Return the number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sorted(&self, sort: &SortKey<T>) -> Vec<T> {
        let mut all: Vec<T> = self.records.iter().map(|e| e.value().clone()).collect();
        // Ties fall back to identifier order so pages are deterministic.
        all.sort_by(|a, b| sort.compare(a, b).then_with(|| a.id().cmp(&b.id())));
        all
    }

    fn violation(constraint: &str, value: &str) -> Error {
        Error::StoreError(format!(
            "unique constraint '{}' violated by value '{}'",
            constraint, value
        ))
    }

    fn insert_new(&self, mut record: T) -> T {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.set_id(id);
        self.records.insert(id, record.clone());
        record
    }

    /// Overwrite `id` in place, returning the previous record.
    fn overwrite(&self, id: Id, record: T) -> Option<T> {
        self.records
            .get_mut(&id)
            .map(|mut existing| std::mem::replace(&mut *existing, record))
    }

    fn release(&self, value: &str, owner: Id) {
        self.claims.remove_if(value, |_, claimed_by| *claimed_by == owner);
    }
}

impl<T: Record> Clone for InMemoryStore<T> {
    fn clone(&self) -> Self {
        InMemoryStore {
            records: Arc::clone(&self.records),
            claims: Arc::clone(&self.claims),
            next_id: Arc::clone(&self.next_id),
            unique: self.unique.clone(),
        }
    }
}

impl<T: Record> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> EntityStore<T> for InMemoryStore<T> {
    async fn fetch_all(&self, sort: &SortKey<T>) -> Result<Vec<T>> {
        Ok(self.sorted(sort))
    }

    async fn fetch_page(&self, sort: &SortKey<T>, skip: u64, take: u64) -> Result<Vec<T>> {
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(take).unwrap_or(usize::MAX);
        Ok(self.sorted(sort).into_iter().skip(skip).take(take).collect())
    }

    async fn count(&self, filter: Option<&Filter<T>>) -> Result<u64> {
        let count = match filter {
            Some(filter) => self.records.iter().filter(|e| filter.matches(e.value())).count(),
            None => self.records.len(),
        };
        Ok(count as u64)
    }

    async fn fetch_by_id(&self, id: Id) -> Result<Option<T>> {
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }

    async fn exists(&self, id: Id) -> Result<bool> {
        Ok(self.records.contains_key(&id))
    }

    async fn create(&self, record: T) -> Result<T> {
        let created = match &self.unique {
            None => self.insert_new(record),
            Some((constraint, key)) => match self.claims.entry(key(&record)) {
                Entry::Occupied(taken) => return Err(Self::violation(constraint, taken.key())),
                Entry::Vacant(slot) => {
                    let created = self.insert_new(record);
                    slot.insert(created.id());
                    created
                }
            },
        };

        debug!("✓ InMemoryStore CREATE id={}", created.id());
        Ok(created)
    }

    async fn replace(&self, id: Id, mut record: T) -> Result<bool> {
        record.set_id(id);

        let Some((constraint, key)) = &self.unique else {
            let replaced = self.overwrite(id, record).is_some();
            if replaced {
                debug!("✓ InMemoryStore REPLACE id={}", id);
            }
            return Ok(replaced);
        };

        let wanted = key(&record);
        let previous = match self.claims.entry(wanted.clone()) {
            Entry::Occupied(taken) if *taken.get() != id => {
                return Err(Self::violation(constraint, &wanted))
            }
            // The record keeps its own unique value.
            Entry::Occupied(_) => self.overwrite(id, record),
            Entry::Vacant(slot) => {
                let previous = self.overwrite(id, record);
                if previous.is_some() {
                    slot.insert(id);
                }
                previous
            }
        };

        match previous {
            Some(previous) => {
                let released = key(&previous);
                if released != wanted {
                    self.release(&released, id);
                }
                debug!("✓ InMemoryStore REPLACE id={}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: Id) -> Result<u64> {
        let removed = match self.records.remove(&id) {
            Some((_, record)) => {
                if let Some((_, key)) = &self.unique {
                    self.release(&key(&record), id);
                }
                true
            }
            None => false,
        };
        debug!("✓ InMemoryStore DELETE id={} removed={}", id, removed);
        Ok(u64::from(removed))
    }
}
