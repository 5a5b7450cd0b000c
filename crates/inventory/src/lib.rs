//! Inventory: stock records per SKU and the manager that mutates them.
//!
//! Stock only changes through [`InventoryManager`], which enforces
//! non-negative quantities, evaluates the low-stock threshold after each sale,
//! and raises alerts through the shared notification dispatcher.

pub mod manager;
pub mod repository;
pub mod stock;

pub use manager::{InventoryConfig, InventoryError, InventoryManager, RestockOutcome, SellOutcome};
pub use repository::StockRepository;
pub use stock::{Product, StockRecord};
