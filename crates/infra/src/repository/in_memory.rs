use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::{OrderId, RepositoryError, Sku};
use storefront_inventory::{StockRecord, StockRepository};
use storefront_sales::{Order, OrderRepository};

#[derive(Debug, Clone)]
struct OrderRow {
    order: Order,
    /// Persisted state column, kept as a raw name like a database would.
    state: String,
}

/// In-memory order store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    rows: RwLock<HashMap<OrderId, OrderRow>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite the persisted state column of an existing row.
    ///
    /// Simulates rows written by another application version.
    pub fn overwrite_state(
        &self,
        order_id: &OrderId,
        state: impl Into<String>,
    ) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;
        Ok(match rows.get_mut(order_id) {
            Some(row) => {
                row.state = state.into();
                true
            }
            None => false,
        })
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn find_state_seed(&self, order_id: &OrderId) -> Result<Option<String>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.get(order_id).map(|row| row.state.clone()))
    }

    fn persist(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| RepositoryError::Poisoned)?;
        rows.insert(
            order.id().clone(),
            OrderRow {
                order: order.clone(),
                state: order.state().as_str().to_string(),
            },
        );
        Ok(())
    }

    fn find(&self, order_id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(rows.get(order_id).map(|row| row.order.clone()))
    }
}

/// In-memory stock store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStockRepository {
    records: RwLock<HashMap<Sku, StockRecord>>,
}

impl InMemoryStockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = StockRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.sku().clone(), record))
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }

    /// All records, ordered by SKU.
    pub fn list(&self) -> Vec<StockRecord> {
        let Ok(records) = self.records.read() else {
            return vec![];
        };
        let mut out: Vec<_> = records.values().cloned().collect();
        out.sort_by(|a, b| a.sku().cmp(b.sku()));
        out
    }
}

impl StockRepository for InMemoryStockRepository {
    fn find_by_sku(&self, sku: &Sku) -> Result<Option<StockRecord>, RepositoryError> {
        let records = self.records.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(records.get(sku).cloned())
    }

    fn save(&self, record: &StockRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(|_| RepositoryError::Poisoned)?;
        records.insert(record.sku().clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::UserId;
    use storefront_inventory::Product;
    use storefront_sales::{LineItem, OrderBuilder, OrderState};

    fn order(id: &str) -> Order {
        OrderBuilder::new(UserId::new(), OrderId::new(id))
            .item(LineItem::new(Sku::new("CAP-RED"), "Cap", 1, 1_500))
            .shipping_address("5 Elm Row")
            .payment_method("paypal")
            .build()
            .unwrap()
    }

    #[test]
    fn persist_then_find_and_seed() {
        let repo = InMemoryOrderRepository::new();
        let id = OrderId::new("ORD-REPO0001");
        repo.persist(&order(id.as_str())).unwrap();

        assert_eq!(repo.find(&id).unwrap().map(|o| o.state()), Some(OrderState::Pending));
        assert_eq!(repo.find_state_seed(&id).unwrap().as_deref(), Some("PENDING"));
        assert_eq!(repo.find_state_seed(&OrderId::new("ORD-NONE")).unwrap(), None);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn overwrite_state_only_touches_existing_rows() {
        let repo = InMemoryOrderRepository::new();
        let id = OrderId::new("ORD-REPO0002");
        repo.persist(&order(id.as_str())).unwrap();

        assert!(repo.overwrite_state(&id, "ARCHIVED").unwrap());
        assert!(!repo.overwrite_state(&OrderId::new("ORD-NONE"), "X").unwrap());
        assert_eq!(repo.find_state_seed(&id).unwrap().as_deref(), Some("ARCHIVED"));
    }

    #[test]
    fn stock_save_replaces_record() {
        let repo = InMemoryStockRepository::with_records([StockRecord::new(
            Sku::new("B"),
            Product::new("Belt"),
            1,
        )]);
        repo.save(&StockRecord::new(Sku::new("A"), Product::new("Apron"), 4))
            .unwrap();
        repo.save(&StockRecord::new(Sku::new("B"), Product::new("Belt"), 9))
            .unwrap();

        let quantities: Vec<_> = repo
            .list()
            .iter()
            .map(|r| (r.sku().to_string(), r.quantity()))
            .collect();
        assert_eq!(
            quantities,
            vec![("A".to_string(), 4), ("B".to_string(), 9)]
        );
    }
}
