//! `storefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the order,
//! inventory and notification crates (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, RepositoryError};
pub use id::{OrderId, Sku, UserId};
pub use value_object::ValueObject;
