use std::sync::Arc;

use storefront_core::{RepositoryError, Sku};

use crate::stock::StockRecord;

/// Stock persistence port. One record per SKU.
pub trait StockRepository: Send + Sync {
    fn find_by_sku(&self, sku: &Sku) -> Result<Option<StockRecord>, RepositoryError>;

    /// Insert or replace the record for its SKU.
    fn save(&self, record: &StockRecord) -> Result<(), RepositoryError>;
}

impl<R> StockRepository for Arc<R>
where
    R: StockRepository + ?Sized,
{
    fn find_by_sku(&self, sku: &Sku) -> Result<Option<StockRecord>, RepositoryError> {
        (**self).find_by_sku(sku)
    }

    fn save(&self, record: &StockRecord) -> Result<(), RepositoryError> {
        (**self).save(record)
    }
}
