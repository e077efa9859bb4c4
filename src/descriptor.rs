//! Static per-resource configuration consumed by the orchestrator.
//!
//! A [`ResourceDescriptor`] is plain data: which tag its cache entries carry,
//! where created records can be found, and how the collection is ordered.
//! Per-resource differences live here instead of in code forks.

use crate::record::{Id, Record};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type CompareFn<T> = dyn Fn(&T, &T) -> Ordering + Send + Sync;
type PredicateFn<T> = dyn Fn(&T) -> bool + Send + Sync;

/// Ordering key selector for a record type.
///
/// Carries a stable `name` (usable as a column name by SQL-backed stores) and
/// a comparator used by stores that sort in process.
pub struct SortKey<T> {
    name: &'static str,
    compare: Arc<CompareFn<T>>,
}

impl<T> SortKey<T> {
    /// Order ascending by the key extracted with `f`.
    ///
    /// ```
    /// use resource_kit::descriptor::SortKey;
    ///
    /// struct Genre { id: i64, name: String }
    ///
    /// let by_name = SortKey::by_key("name", |g: &Genre| g.name.clone());
    /// assert_eq!(by_name.name(), "name");
    /// ```
    pub fn by_key<K, F>(name: &'static str, f: F) -> Self
    where
        T: 'static,
        K: Ord + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        SortKey {
            name,
            compare: Arc::new(move |a, b| f(a).cmp(&f(b))),
        }
    }

    /// Column/field name of the key.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Compare two records by this key.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.compare)(a, b)
    }
}

impl<T: Record> SortKey<T> {
    /// Order ascending by identifier.
    pub fn by_id() -> Self {
        Self::by_key("id", |r: &T| r.id())
    }
}

impl<T> Clone for SortKey<T> {
    fn clone(&self) -> Self {
        SortKey {
            name: self.name,
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T> fmt::Debug for SortKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortKey").field("name", &self.name).finish()
    }
}

/// Optional predicate passed to `EntityStore::count`.
pub struct Filter<T> {
    name: &'static str,
    predicate: Arc<PredicateFn<T>>,
}

impl<T> Filter<T> {
    pub fn new<F>(name: &'static str, predicate: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Filter {
            name,
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, record: &T) -> bool {
        (self.predicate)(record)
    }
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Filter {
            name: self.name,
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

/// Static configuration for one resource type.
///
/// Created at process start and never mutated; the orchestrator owns it and is
/// itself shared behind an `Arc`.
///
/// # Example
///
/// ```
/// use resource_kit::descriptor::{ResourceDescriptor, SortKey};
/// use resource_kit::record::{Id, Record};
///
/// #[derive(Clone)]
/// struct Genre { id: Id, name: String }
///
/// impl Record for Genre {
///     fn id(&self) -> Id { self.id }
///     fn set_id(&mut self, id: Id) { self.id = id; }
/// }
///
/// let genres = ResourceDescriptor::new(
///     "generos",
///     "/api/generos/{id}",
///     SortKey::by_key("name", |g: &Genre| g.name.clone()),
/// );
///
/// assert_eq!(genres.tag(), "generos");
/// assert_eq!(genres.location(5), "/api/generos/5");
/// ```
#[derive(Clone, Debug)]
pub struct ResourceDescriptor<T> {
    name: String,
    tag: String,
    route_template: String,
    sort_key: SortKey<T>,
    ttl: Option<Duration>,
}

impl<T> ResourceDescriptor<T> {
    /// Placeholder replaced by the identifier in `route_template`.
    pub const ID_PLACEHOLDER: &'static str = "{id}";

    /// Create a descriptor whose name and cache tag are both `name`.
    ///
    /// A template without `{id}` gets `/{id}` appended.
    pub fn new(
        name: impl Into<String>,
        route_template: impl Into<String>,
        sort_key: SortKey<T>,
    ) -> Self {
        let name = name.into();
        let mut route_template = route_template.into();
        if !route_template.contains(Self::ID_PLACEHOLDER) {
            route_template = format!(
                "{}/{}",
                route_template.trim_end_matches('/'),
                Self::ID_PLACEHOLDER
            );
        }

        ResourceDescriptor {
            tag: name.clone(),
            name,
            route_template,
            sort_key,
            ttl: None,
        }
    }

    /// Use a cache tag that differs from the resource name.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Override the process-wide cache TTL for this resource.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn route_template(&self) -> &str {
        &self.route_template
    }

    pub fn sort_key(&self) -> &SortKey<T> {
        &self.sort_key
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Location reference for a record with the given identifier.
    pub fn location(&self, id: Id) -> String {
        self.route_template
            .replace(Self::ID_PLACEHOLDER, &id.to_string())
    }
}
