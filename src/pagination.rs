//! Pagination calculator and page payloads.
//!
//! Pagination is offset-based: a request names a 1-based page and a page size,
//! and [`compute_slice`] turns that into a `(skip, take)` pair. Out-of-range
//! values are clamped, never rejected.
//!
//! The total count returned next to a page comes from a separate counting
//! query against the same collection. The two queries are not
//! snapshot-isolated, so under concurrent writes the reported total and the
//! returned items may disagree by at most the number of writes that land
//! between them.

use serde::{Deserialize, Serialize};

/// Sub-range of an ordered result set that a page represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slice {
    pub skip: u64,
    pub take: u64,
}

/// Compute the slice for a page request.
///
/// - `records_per_page` is clamped to `[1, max_per_page]`
/// - `page` is raised to at least 1
/// - `skip = (page - 1) * records_per_page`, `take = records_per_page`
///
/// A `max_per_page` of zero is treated as one. Pure and deterministic.
///
/// ```
/// use resource_kit::pagination::{compute_slice, Slice};
///
/// assert_eq!(compute_slice(3, 10, 50), Slice { skip: 20, take: 10 });
/// assert_eq!(compute_slice(0, 500, 50), Slice { skip: 0, take: 50 });
/// ```
pub fn compute_slice(page: i64, records_per_page: i64, max_per_page: u32) -> Slice {
    let max = i64::from(max_per_page.max(1));
    let per_page = records_per_page.clamp(1, max) as u64;
    let page = page.max(1) as u64;

    Slice {
        skip: (page - 1).saturating_mul(per_page),
        take: per_page,
    }
}

/// Page request as received from a caller.
///
/// Fields are optional so that a missing query parameter falls back to the
/// configured default page size. Values are signed so that negative input
/// clamps instead of failing to parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<i64>,

    #[serde(default, rename = "pageSize", alias = "recordsPerPage")]
    pub records_per_page: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, records_per_page: i64) -> Self {
        PageRequest {
            page: Some(page),
            records_per_page: Some(records_per_page),
        }
    }

    /// Resolve defaults and clamp against the configured limits.
    pub fn normalize(&self, default_per_page: u32, max_per_page: u32) -> NormalizedPage {
        let requested = self
            .records_per_page
            .unwrap_or_else(|| i64::from(default_per_page));
        let slice = compute_slice(self.page.unwrap_or(1), requested, max_per_page);

        NormalizedPage {
            page: slice.skip / slice.take + 1,
            records_per_page: slice.take,
            slice,
        }
    }
}

/// A page request after defaults and clamping have been applied.
///
/// Cache keys are derived from this, so `?page=0` and `?page=1` share an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NormalizedPage {
    pub page: u64,
    pub records_per_page: u64,
    pub slice: Slice,
}

/// Items of one page plus the total record count at computation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<O> {
    pub items: Vec<O>,
    pub total_count: u64,
}

impl<O> Page<O> {
    pub fn empty() -> Self {
        Page {
            items: Vec::new(),
            total_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
