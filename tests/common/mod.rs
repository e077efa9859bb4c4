//! Catalog resources shared by the integration tests.

#![allow(dead_code)]

use resource_kit::backend::CacheBackend;
use resource_kit::descriptor::{Filter, ResourceDescriptor, SortKey};
use resource_kit::error::Result;
use resource_kit::record::{Id, Record, UNASSIGNED_ID};
use resource_kit::store::{EntityStore, InMemoryStore};
use resource_kit::{validation, CrudOrchestrator, Projection};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Genres
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Genre {
    pub id: Id,
    pub name: String,
}

impl Record for Genre {
    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenreInput {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenreDto {
    pub id: Id,
    pub name: String,
}

pub struct GenreProjection;

impl Projection<Genre> for GenreProjection {
    type Input = GenreInput;
    type Output = GenreDto;

    fn to_record(&self, input: GenreInput) -> Genre {
        Genre {
            id: UNASSIGNED_ID,
            name: input.name,
        }
    }

    fn to_response(&self, record: &Genre) -> GenreDto {
        GenreDto {
            id: record.id,
            name: record.name.clone(),
        }
    }

    fn validate(&self, input: &GenreInput) -> Result<()> {
        validation::name("name", &input.name)
    }
}

pub fn genre_descriptor() -> ResourceDescriptor<Genre> {
    ResourceDescriptor::new(
        "generos",
        "/api/generos/{id}",
        SortKey::by_key("name", |g: &Genre| g.name.clone()),
    )
}

pub fn genre(name: &str) -> GenreInput {
    GenreInput {
        name: name.to_string(),
    }
}

pub type Genres<S, B> = CrudOrchestrator<Genre, GenreProjection, S, B>;

pub fn genres<B: CacheBackend>(backend: B) -> Genres<InMemoryStore<Genre>, B> {
    CrudOrchestrator::new(
        genre_descriptor(),
        GenreProjection,
        InMemoryStore::new(),
        backend,
    )
}

// ============================================================================
// Cinemas
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Cinema {
    pub id: Id,
    pub name: String,
}

impl Record for Cinema {
    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CinemaInput {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CinemaDto {
    pub id: Id,
    pub name: String,
}

pub struct CinemaProjection;

impl Projection<Cinema> for CinemaProjection {
    type Input = CinemaInput;
    type Output = CinemaDto;

    fn to_record(&self, input: CinemaInput) -> Cinema {
        Cinema {
            id: UNASSIGNED_ID,
            name: input.name,
        }
    }

    fn to_response(&self, record: &Cinema) -> CinemaDto {
        CinemaDto {
            id: record.id,
            name: record.name.clone(),
        }
    }

    fn validate(&self, input: &CinemaInput) -> Result<()> {
        validation::required("name", &input.name)?;
        validation::max_length("name", &input.name, validation::NAME_MAX_LENGTH)
    }
}

pub fn cinemas<B: CacheBackend>(
    backend: B,
) -> CrudOrchestrator<Cinema, CinemaProjection, InMemoryStore<Cinema>, B> {
    CrudOrchestrator::new(
        ResourceDescriptor::new("cines", "/api/cines/{id}", SortKey::by_id()),
        CinemaProjection,
        InMemoryStore::new(),
        backend,
    )
}

pub fn cinema(name: &str) -> CinemaInput {
    CinemaInput {
        name: name.to_string(),
    }
}

// ============================================================================
// Slow store: snapshots immediately, answers late
// ============================================================================

/// Store whose reads take their snapshot first and then wait `delay` before
/// returning, so a mutation can commit between the read and the cache fill.
#[derive(Clone)]
pub struct SlowStore<T: Record> {
    pub inner: InMemoryStore<T>,
    pub delay: Duration,
}

impl<T: Record> SlowStore<T> {
    pub fn new(delay: Duration) -> Self {
        SlowStore {
            inner: InMemoryStore::new(),
            delay,
        }
    }
}

impl<T: Record> EntityStore<T> for SlowStore<T> {
    async fn fetch_all(&self, sort: &SortKey<T>) -> Result<Vec<T>> {
        let snapshot = self.inner.fetch_all(sort).await;
        tokio::time::sleep(self.delay).await;
        snapshot
    }

    async fn fetch_page(&self, sort: &SortKey<T>, skip: u64, take: u64) -> Result<Vec<T>> {
        let snapshot = self.inner.fetch_page(sort, skip, take).await;
        tokio::time::sleep(self.delay).await;
        snapshot
    }

    async fn count(&self, filter: Option<&Filter<T>>) -> Result<u64> {
        self.inner.count(filter).await
    }

    async fn fetch_by_id(&self, id: Id) -> Result<Option<T>> {
        let snapshot = self.inner.fetch_by_id(id).await;
        tokio::time::sleep(self.delay).await;
        snapshot
    }

    async fn create(&self, record: T) -> Result<T> {
        self.inner.create(record).await
    }

    async fn replace(&self, id: Id, record: T) -> Result<bool> {
        self.inner.replace(id, record).await
    }

    async fn delete_by_id(&self, id: Id) -> Result<u64> {
        self.inner.delete_by_id(id).await
    }
}

// ============================================================================
// Lagging writer: slow before and/or after the commit point
// ============================================================================

/// Store whose `create` waits `before_commit`, commits, then waits
/// `after_commit` before acknowledging.
#[derive(Clone)]
pub struct LaggingWriteStore<T: Record> {
    pub inner: InMemoryStore<T>,
    pub before_commit: Duration,
    pub after_commit: Duration,
}

impl<T: Record> LaggingWriteStore<T> {
    pub fn new(before_commit: Duration, after_commit: Duration) -> Self {
        LaggingWriteStore {
            inner: InMemoryStore::new(),
            before_commit,
            after_commit,
        }
    }
}

impl<T: Record> EntityStore<T> for LaggingWriteStore<T> {
    async fn fetch_all(&self, sort: &SortKey<T>) -> Result<Vec<T>> {
        self.inner.fetch_all(sort).await
    }

    async fn fetch_page(&self, sort: &SortKey<T>, skip: u64, take: u64) -> Result<Vec<T>> {
        self.inner.fetch_page(sort, skip, take).await
    }

    async fn count(&self, filter: Option<&Filter<T>>) -> Result<u64> {
        self.inner.count(filter).await
    }

    async fn fetch_by_id(&self, id: Id) -> Result<Option<T>> {
        self.inner.fetch_by_id(id).await
    }

    async fn create(&self, record: T) -> Result<T> {
        tokio::time::sleep(self.before_commit).await;
        let created = self.inner.create(record).await;
        tokio::time::sleep(self.after_commit).await;
        created
    }

    async fn replace(&self, id: Id, record: T) -> Result<bool> {
        self.inner.replace(id, record).await
    }

    async fn delete_by_id(&self, id: Id) -> Result<u64> {
        self.inner.delete_by_id(id).await
    }
}
