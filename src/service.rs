//! Shareable handle around a [`CrudOrchestrator`] for web applications.

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::orchestrator::{Created, CrudOrchestrator};
use crate::pagination::{Page, PageRequest};
use crate::projection::Projection;
use crate::record::{Id, Record};
use crate::store::EntityStore;
use std::sync::Arc;

/// High-level resource service for web applications.
///
/// Wraps `CrudOrchestrator` in `Arc` so it can be cloned into every request
/// handler without an external `Arc<Mutex<>>`: the orchestrator only takes
/// `&self`, and the store and backend use interior mutability.
///
/// # Example
///
/// ```ignore
/// use resource_kit::{CrudService, backend::InMemoryBackend, store::InMemoryStore};
///
/// let genres = CrudService::new(CrudOrchestrator::new(
///     genre_descriptor(),
///     GenreProjection,
///     InMemoryStore::new(),
///     backend.clone(),
/// ));
///
/// // Cheap - just an Arc increment
/// let for_router = genres.clone();
/// ```
pub struct CrudService<T, P, S, B>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    orchestrator: Arc<CrudOrchestrator<T, P, S, B>>,
}

impl<T, P, S, B> Clone for CrudService<T, P, S, B>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    fn clone(&self) -> Self {
        CrudService {
            orchestrator: Arc::clone(&self.orchestrator),
        }
    }
}

impl<T, P, S, B> CrudService<T, P, S, B>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    /// Wrap an orchestrator for sharing.
    pub fn new(orchestrator: CrudOrchestrator<T, P, S, B>) -> Self {
        CrudService {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Get reference to the underlying orchestrator.
    pub fn orchestrator(&self) -> &CrudOrchestrator<T, P, S, B> {
        &self.orchestrator
    }

    pub async fn list(&self, request: PageRequest) -> Result<Page<P::Output>> {
        self.orchestrator.list(request).await
    }

    pub async fn list_all(&self) -> Result<Vec<P::Output>> {
        self.orchestrator.list_all().await
    }

    pub async fn get(&self, id: Id) -> Result<P::Output> {
        self.orchestrator.get(id).await
    }

    pub async fn create(&self, input: P::Input) -> Result<Created<P::Output>> {
        self.orchestrator.create(input).await
    }

    pub async fn replace(&self, id: Id, input: P::Input) -> Result<()> {
        self.orchestrator.replace(id, input).await
    }

    pub async fn delete(&self, id: Id) -> Result<()> {
        self.orchestrator.delete(id).await
    }
}
