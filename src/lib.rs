//! # resource-kit
//!
//! A generic serving layer for independently-typed record collections:
//! paginated, cache-accelerated reads and tag-evicting mutations, with one
//! orchestrator type shared by every resource.
//!
//! ## Features
//!
//! - **Generic CRUD:** list, list all, get, create, replace, delete for any `T: Record`
//! - **Pagination:** clamped page/size slices plus a total count
//! - **Tag-scoped eviction:** every mutation evicts all cached reads of its resource
//!   before it returns, including fills racing with it
//! - **Backend Agnostic:** in-memory (DashMap) or Redis tag index
//! - **Store Agnostic:** implement [`EntityStore`] over any database
//! - **HTTP:** optional axum router with status and header mapping (feature `http`)
//!
//! ## Quick Start
//!
//! ```ignore
//! use resource_kit::{
//!     backend::InMemoryBackend,
//!     descriptor::{ResourceDescriptor, SortKey},
//!     store::InMemoryStore,
//!     CrudOrchestrator, CrudService, PageRequest,
//! };
//!
//! // 1. Describe the resource
//! let descriptor = ResourceDescriptor::new(
//!     "generos",
//!     "/api/generos/{id}",
//!     SortKey::by_key("name", |g: &Genre| g.name.clone()),
//! );
//!
//! // 2. Wire store, projection and cache into one service
//! let genres = CrudService::new(CrudOrchestrator::new(
//!     descriptor,
//!     GenreProjection,
//!     InMemoryStore::new(),
//!     InMemoryBackend::new(),
//! ));
//!
//! // 3. Use it - CrudService is Clone for sharing between handlers
//! let created = genres.create(GenreInput { name: "Comedia".into() }).await?;
//! let page = genres.list(PageRequest::new(1, 10)).await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod config;
pub mod descriptor;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod key;
pub mod observability;
pub mod orchestrator;
pub mod pagination;
pub mod projection;
pub mod record;
pub mod serialization;
pub mod service;
pub mod store;
pub mod validation;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use config::ServeConfig;
pub use descriptor::{ResourceDescriptor, SortKey};
pub use error::{Error, Result};
#[cfg(feature = "http")]
pub use http::crud_router;
pub use orchestrator::{Created, CrudOrchestrator};
pub use pagination::{Page, PageRequest};
pub use projection::Projection;
pub use record::{Id, Record};
pub use service::CrudService;
pub use store::EntityStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
