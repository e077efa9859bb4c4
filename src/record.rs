//! Core record trait that every persisted resource type implements.

/// Store-assigned record identifier.
pub type Id = i64;

/// Identifier carried by a record that has not been persisted yet.
pub const UNASSIGNED_ID: Id = 0;

/// Trait that all persisted records must implement.
///
/// A record is owned by the entity store. Its `Id` is assigned by the store on
/// create, is immutable afterwards and is never reused.
///
/// # Example
///
/// ```
/// use resource_kit::record::{Id, Record};
///
/// #[derive(Clone)]
/// pub struct Genre {
///     pub id: Id,
///     pub name: String,
/// }
///
/// impl Record for Genre {
///     fn id(&self) -> Id {
///         self.id
///     }
///
///     fn set_id(&mut self, id: Id) {
///         self.id = id;
///     }
/// }
/// ```
pub trait Record: Clone + Send + Sync + 'static {
    /// Return the record's identifier (`UNASSIGNED_ID` before create).
    fn id(&self) -> Id;

    /// Overwrite the identifier.
    ///
    /// Called by stores on create and by the orchestrator on replace, where
    /// the path identifier always wins over whatever the input carried.
    fn set_id(&mut self, id: Id);

    /// True once the store has assigned an identifier.
    fn is_persisted(&self) -> bool {
        self.id() != UNASSIGNED_ID
    }
}
