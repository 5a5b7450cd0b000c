//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are compared by their attributes.
/// A `LineItem` is one: two items with the same SKU, quantity and captured
/// price are interchangeable. They are not mutated after construction; to
/// "change" one, build a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Product { name: String, size: Option<String>, color: Option<String> }
///
/// impl ValueObject for Product {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
