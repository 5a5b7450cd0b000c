//! Entity trait: identity that survives state changes.

/// Something with a stable identity.
///
/// An `Order` stays the same order while its state moves from PENDING to
/// DELIVERED; a `StockRecord` stays bound to its SKU while the quantity changes.
pub trait Entity {
    /// Strongly-typed identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
