//! Repository adapters.
//!
//! Only in-memory adapters ship here; a database-backed adapter implements the
//! same `OrderRepository` / `StockRepository` ports.

pub mod in_memory;

pub use in_memory::{InMemoryOrderRepository, InMemoryStockRepository};
