//! Projection trait mapping persisted records to and from external shapes.

use crate::error::Result;
use crate::record::Record;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Mapping between a persisted record and its request/response shapes.
///
/// One projection per resource type. The orchestrator calls `validate` before
/// any store or cache access, `to_record` to build the record to persist, and
/// `to_response` for everything it returns or caches.
///
/// `Output` is cached in postcard form, so it must round-trip through serde
/// without self-describing tricks (no `skip_serializing_if`, no untagged enums).
///
/// # Example
///
/// ```
/// use resource_kit::projection::Projection;
/// use resource_kit::record::{Id, Record, UNASSIGNED_ID};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone)]
/// struct Genre { id: Id, name: String }
///
/// impl Record for Genre {
///     fn id(&self) -> Id { self.id }
///     fn set_id(&mut self, id: Id) { self.id = id; }
/// }
///
/// #[derive(Deserialize)]
/// struct GenreInput { name: String }
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct GenreDto { id: Id, name: String }
///
/// struct GenreProjection;
///
/// impl Projection<Genre> for GenreProjection {
///     type Input = GenreInput;
///     type Output = GenreDto;
///
///     fn to_record(&self, input: GenreInput) -> Genre {
///         Genre { id: UNASSIGNED_ID, name: input.name }
///     }
///
///     fn to_response(&self, record: &Genre) -> GenreDto {
///         GenreDto { id: record.id, name: record.name.clone() }
///     }
/// }
/// ```
pub trait Projection<T: Record>: Send + Sync + 'static {
    /// Request shape accepted by create and replace.
    type Input: DeserializeOwned + Send + 'static;

    /// Response shape returned by reads and create.
    type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Build a record from input. The identifier is left unassigned.
    fn to_record(&self, input: Self::Input) -> T;

    /// Build the response shape for a persisted record.
    ///
    /// When the output carries an identifier it must equal `record.id()`.
    fn to_response(&self, record: &T) -> Self::Output;

    /// Optional: Validate input before it reaches the store.
    ///
    /// Return `Error::ValidationError` to reject with a 400.
    fn validate(&self, _input: &Self::Input) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Generic Projection Implementations
// ============================================================================

/// Identity projection for records that are exposed as-is.
///
/// Input and output are the record type itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityProjection;

impl<T> Projection<T> for IdentityProjection
where
    T: Record + Serialize + DeserializeOwned,
{
    type Input = T;
    type Output = T;

    fn to_record(&self, mut input: T) -> T {
        input.set_id(crate::record::UNASSIGNED_ID);
        input
    }

    fn to_response(&self, record: &T) -> T {
        record.clone()
    }
}
