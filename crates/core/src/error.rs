//! Domain and repository error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// unknown persisted states). Expected business outcomes such as an invalid
/// transition or insufficient stock are *not* errors; they are modeled as
/// outcome values by the owning crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. an incomplete order).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state name could not be mapped to a known order state.
    #[error("unknown order state: {0}")]
    UnknownState(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unknown_state(name: impl Into<String>) -> Self {
        Self::UnknownState(name.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Failure reported by a persistence collaborator.
///
/// Repositories are external; the core only needs to know that a read or a
/// write did not go through.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The backing store could not be reached or rejected the operation.
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// An in-process lock guarding the store was poisoned.
    #[error("repository lock poisoned")]
    Poisoned,
}

impl RepositoryError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
