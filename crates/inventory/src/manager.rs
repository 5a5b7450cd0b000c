//! Stock mutation and threshold alerts.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use storefront_core::{RepositoryError, Sku};
use storefront_notifications::{AlertCategory, NotificationDispatcher};

use crate::repository::StockRepository;
use crate::stock::StockRecord;

const STOCK_ALERT_TITLE: &str = "Inventory alert";
const SALE_FAILED_TITLE: &str = "Sale failed";

/// Inventory tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryConfig {
    /// A sale leaving `0 < remaining <= low_stock_threshold` raises a low-stock alert.
    pub low_stock_threshold: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 3,
        }
    }
}

impl InventoryConfig {
    pub fn with_low_stock_threshold(mut self, threshold: u32) -> Self {
        self.low_stock_threshold = threshold;
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of a sell request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellOutcome {
    /// No stock record exists for the SKU; nothing happened.
    UnknownSku,
    Sold { remaining: u32 },
    /// Not enough stock. Nothing was mutated and a "sale failed" alert was raised.
    InsufficientStock { available: u32, requested: u32 },
}

/// Result of a restock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestockOutcome {
    UnknownSku,
    Restocked { quantity: u32 },
}

/// Owns every stock mutation.
///
/// Per-SKU serialization of concurrent calls is the caller's responsibility.
pub struct InventoryManager {
    repository: Arc<dyn StockRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    config: InventoryConfig,
}

impl InventoryManager {
    pub fn new(
        repository: Arc<dyn StockRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        config: InventoryConfig,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn sell(&self, sku: &Sku, quantity: u32) -> Result<SellOutcome, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }

        let Some(mut record) = self.repository.find_by_sku(sku)? else {
            debug!(%sku, "sell ignored: no stock record");
            return Ok(SellOutcome::UnknownSku);
        };

        let available = record.quantity();
        let Some(remaining) = record.take(quantity) else {
            info!(%sku, requested = quantity, available, "sale rejected: insufficient stock");
            self.dispatcher.notify_unthrottled(
                AlertCategory::SaleFailed,
                SALE_FAILED_TITLE,
                format!(
                    "Not enough stock to sell {} x {}",
                    quantity,
                    record.product().detailed_name()
                ),
            );
            return Ok(SellOutcome::InsufficientStock {
                available,
                requested: quantity,
            });
        };

        self.repository.save(&record)?;
        info!(%sku, quantity, remaining, "sale recorded");

        self.evaluate_thresholds(&record);
        Ok(SellOutcome::Sold { remaining })
    }

    pub fn restock(&self, sku: &Sku, quantity: u32) -> Result<RestockOutcome, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }

        let Some(mut record) = self.repository.find_by_sku(sku)? else {
            debug!(%sku, "restock ignored: no stock record");
            return Ok(RestockOutcome::UnknownSku);
        };

        let total = record.put(quantity);
        self.repository.save(&record)?;
        info!(%sku, quantity, remaining = total, "stock replenished");

        self.dispatcher.notify_stock_alert(
            sku.as_str(),
            AlertCategory::StockNormalized,
            STOCK_ALERT_TITLE,
            format!(
                "Restocked {}: {} units available",
                record.product().detailed_name(),
                total
            ),
        );
        Ok(RestockOutcome::Restocked { quantity: total })
    }

    /// Current stock for `sku`, if it is tracked.
    pub fn stock_of(&self, sku: &Sku) -> Result<Option<u32>, InventoryError> {
        Ok(self
            .repository
            .find_by_sku(sku)?
            .map(|record| record.quantity()))
    }

    fn evaluate_thresholds(&self, record: &StockRecord) {
        let remaining = record.quantity();
        let name = record.product().detailed_name();

        let (category, text) = if remaining == 0 {
            (AlertCategory::OutOfStock, format!("Out of stock: {name}"))
        } else if remaining <= self.config.low_stock_threshold {
            (
                AlertCategory::LowStock,
                format!("Low stock: {name} has {remaining} units left"),
            )
        } else {
            return;
        };

        self.dispatcher
            .notify_stock_alert(record.sku().as_str(), category, STOCK_ALERT_TITLE, text);
    }
}

impl core::fmt::Debug for InventoryManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InventoryManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
