//! Entity trait: identity plus the kind name the policy layer sees.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Runtime kind name (e.g. `"Issue"`), used verbatim as the policy type.
    const KIND: &'static str;

    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
