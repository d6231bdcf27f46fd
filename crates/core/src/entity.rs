//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every persisted record in this system (stock items, locations, sectors,
/// equipment) is an entity: two values with the same id are the same record,
/// whatever their other fields say.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Whether `other` refers to the same record.
    fn same_identity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
