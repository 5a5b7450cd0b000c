//! Infrastructure layer: repository adapters, configuration, and the
//! workflow that ties orders, inventory and notifications together.

pub mod config;
pub mod repository;
pub mod services;
pub mod workflow;


pub use config::StorefrontConfig;
pub use repository::{InMemoryOrderRepository, InMemoryStockRepository};
pub use services::{Runtime, Storefront};
pub use workflow::{CheckoutReceipt, CheckoutRequest, OrderWorkflow, TransitionReport, WorkflowError};
