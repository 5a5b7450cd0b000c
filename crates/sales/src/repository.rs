use std::sync::Arc;

use storefront_core::{OrderId, RepositoryError};

use crate::order::Order;

/// Order persistence port.
///
/// Implemented by infrastructure; the in-memory adapter lives in `storefront-infra`.
pub trait OrderRepository: Send + Sync {
    /// Persisted state name of an order, used to seed its state machine.
    ///
    /// Returned as a raw name so that corrupted rows surface as
    /// `DomainError::UnknownState` instead of failing to load.
    fn find_state_seed(&self, order_id: &OrderId) -> Result<Option<String>, RepositoryError>;

    fn persist(&self, order: &Order) -> Result<(), RepositoryError>;

    fn find(&self, order_id: &OrderId) -> Result<Option<Order>, RepositoryError>;
}

impl<R> OrderRepository for Arc<R>
where
    R: OrderRepository + ?Sized,
{
    fn find_state_seed(&self, order_id: &OrderId) -> Result<Option<String>, RepositoryError> {
        (**self).find_state_seed(order_id)
    }

    fn persist(&self, order: &Order) -> Result<(), RepositoryError> {
        (**self).persist(order)
    }

    fn find(&self, order_id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        (**self).find(order_id)
    }
}
