//! Service wiring.
//!
//! [`Storefront`] builds the dispatcher, inventory manager and workflow from
//! a [`StorefrontConfig`] and injects them into each other. No globals: every
//! host (binary, test, UI shell) owns its own instance.

use std::sync::Arc;

use storefront_inventory::{InventoryManager, StockRepository};
use storefront_notifications::{
    Clock, InlineDispatch, NotificationDispatcher, Scheduler, Subscriber, SystemClock,
    TimerThread, UiDispatch,
};
use storefront_sales::OrderRepository;

use crate::config::StorefrontConfig;
use crate::repository::{InMemoryOrderRepository, InMemoryStockRepository};
use crate::workflow::OrderWorkflow;

/// Runtime collaborators the storefront does not own.
pub struct Runtime {
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,
    pub ui: Arc<dyn UiDispatch>,
}

impl Runtime {
    /// Wall clock, a `notification-debouncer` timer thread, inline UI dispatch.
    pub fn threaded() -> std::io::Result<Self> {
        Ok(Self {
            clock: Arc::new(SystemClock),
            scheduler: Arc::new(TimerThread::start()?),
            ui: Arc::new(InlineDispatch),
        })
    }

    pub fn with_ui(mut self, ui: Arc<dyn UiDispatch>) -> Self {
        self.ui = ui;
        self
    }
}

/// Fully wired storefront services.
pub struct Storefront {
    config: StorefrontConfig,
    dispatcher: Arc<NotificationDispatcher>,
    inventory: Arc<InventoryManager>,
    workflow: OrderWorkflow,
}

impl Storefront {
    pub fn new(
        config: StorefrontConfig,
        runtime: Runtime,
        orders: Arc<dyn OrderRepository>,
        stock: Arc<dyn StockRepository>,
    ) -> Self {
        let dispatcher = Arc::new(NotificationDispatcher::new(
            config.notifications.clone(),
            runtime.clock,
            runtime.scheduler,
            runtime.ui,
        ));
        let inventory = Arc::new(InventoryManager::new(
            stock,
            dispatcher.clone(),
            config.inventory,
        ));
        let workflow = OrderWorkflow::new(orders, inventory.clone(), dispatcher.clone());

        tracing::info!(
            max_per_window = config.notifications.max_per_window,
            window = ?config.notifications.window,
            debounce = ?config.notifications.debounce,
            low_stock_threshold = config.inventory.low_stock_threshold,
            "storefront services wired"
        );

        Self {
            config,
            dispatcher,
            inventory,
            workflow,
        }
    }

    /// Storefront over the in-memory repositories (tests/dev).
    pub fn in_memory(
        config: StorefrontConfig,
        runtime: Runtime,
        stock: InMemoryStockRepository,
    ) -> (Self, Arc<InMemoryOrderRepository>, Arc<InMemoryStockRepository>) {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let stock = Arc::new(stock);
        let storefront = Self::new(config, runtime, orders.clone(), stock.clone());
        (storefront, orders, stock)
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        self.dispatcher.add_subscriber(subscriber);
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    pub fn inventory(&self) -> &Arc<InventoryManager> {
        &self.inventory
    }

    pub fn workflow(&self) -> &OrderWorkflow {
        &self.workflow
    }
}

impl core::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("workflow", &self.workflow)
            .finish_non_exhaustive()
    }
}
