//! Entity trait: identity + continuity across state changes.

use crate::error::DomainError;

/// Persisted domain object with a stable identity.
///
/// Repositories key their tables by [`Entity::id`] and use [`Entity::KIND`]
/// to phrase lookup failures.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Human-readable entity name ("Product", "Variant", ...).
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// The `NotFound` error for a missing entity of this kind.
    fn not_found(id: &Self::Id) -> DomainError {
        DomainError::not_found(format!("{} with id {} not found", Self::KIND, id))
    }
}
