//! Order workflow: the application-level orchestration around the domain.
//!
//! ```text
//! checkout:    build order ─▶ persist ─▶ sell each line item ─▶ "order placed"
//!
//! transition:  load/cached state machine
//!                ↓
//!              build command (TransitionKind) ─▶ CommandInvoker::run
//!                ↓
//!              state changed? ──no──▶ "transition rejected" alert
//!                ↓ yes
//!              persist ─▶ "transition applied" alert
//!                ↓
//!              canceled? ─▶ restock every line item
//! ```
//!
//! State machines are cached per order id so every transition for an order
//! goes through the same handle. A machine is loaded from its persisted state
//! name the first time it is needed; an unknown name fails the request.
//!
//! Stock side effects never short-circuit: every line is sold or restocked
//! and per-line errors are reported alongside the outcomes.
//!
//! Callers serialize requests per order; the workflow itself only guards its
//! own maps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{error, info, warn};

use storefront_core::{DomainError, OrderId, RepositoryError, Sku, UserId};
use storefront_inventory::{InventoryError, InventoryManager, RestockOutcome, SellOutcome};
use storefront_notifications::{AlertCategory, NotificationDispatcher};
use storefront_sales::{
    CommandError, CommandInvoker, CommandOutcome, ExecutedCommand, LineItem, Order, OrderBuilder,
    OrderRepository, OrderState, OrderStateMachine, SharedStateMachine, TransitionKind, shared,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// What a customer submits at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: String,
    pub payment_method: String,
}

/// Placed order plus the per-line sale outcomes.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub sales: Vec<(Sku, SellOutcome)>,
    /// Lines whose sale errored out; the remaining lines were still attempted.
    pub failures: Vec<(Sku, InventoryError)>,
}

/// Result of a transition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub order_id: OrderId,
    pub kind: TransitionKind,
    pub from: OrderState,
    pub to: OrderState,
    pub outcome: CommandOutcome,
    /// Restocks triggered by a cancellation, in line-item order.
    pub restocked: Vec<(Sku, RestockOutcome)>,
    /// Lines a cancellation could not return to stock.
    pub failures: Vec<(Sku, InventoryError)>,
}

impl TransitionReport {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

pub struct OrderWorkflow {
    orders: Arc<dyn OrderRepository>,
    inventory: Arc<InventoryManager>,
    dispatcher: Arc<NotificationDispatcher>,
    invoker: Mutex<CommandInvoker>,
    machines: Mutex<HashMap<OrderId, SharedStateMachine>>,
}

impl OrderWorkflow {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        inventory: Arc<InventoryManager>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            orders,
            inventory,
            dispatcher,
            invoker: Mutex::new(CommandInvoker::new()),
            machines: Mutex::new(HashMap::new()),
        }
    }

    /// Place an order: persist it, then sell every line item.
    ///
    /// Lines that cannot be sold are reported in the receipt; the order is
    /// still placed. A line whose sale errors does not stop the others.
    pub fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt, WorkflowError> {
        let mut builder = OrderBuilder::new(request.user_id, OrderId::generate())
            .shipping_address(request.shipping_address)
            .payment_method(request.payment_method);
        for item in request.items {
            builder = builder.item(item);
        }
        let order = builder.build()?;

        self.orders.persist(&order)?;
        info!(order_id = %order.id(), total = order.total_cost(), "order placed");

        let mut sales = Vec::with_capacity(order.items().len());
        let mut failures = Vec::new();
        for item in order.items() {
            match self.inventory.sell(&item.sku, item.quantity) {
                Ok(outcome) => {
                    if !matches!(outcome, SellOutcome::Sold { .. }) {
                        warn!(
                            order_id = %order.id(),
                            sku = %item.sku,
                            ?outcome,
                            "line item not sold"
                        );
                    }
                    sales.push((item.sku.clone(), outcome));
                }
                Err(e) => {
                    error!(
                        order_id = %order.id(),
                        sku = %item.sku,
                        error = %e,
                        "sale failed to record"
                    );
                    failures.push((item.sku.clone(), e));
                }
            }
        }

        self.machines_lock().insert(
            order.id().clone(),
            shared(OrderStateMachine::new(order.clone())),
        );
        self.dispatcher.notify_categorized(
            AlertCategory::General,
            "Order placed",
            format!("Order {} placed successfully", order.id()),
        );

        Ok(CheckoutReceipt {
            order,
            sales,
            failures,
        })
    }

    /// Request a state transition for an order.
    pub fn transition(
        &self,
        order_id: &OrderId,
        kind: TransitionKind,
    ) -> Result<TransitionReport, WorkflowError> {
        let machine = self.machine_for(order_id)?;
        let from = current_state(order_id, &machine)?;

        let command = kind.command(order_id.clone(), machine.clone());
        let outcome = self
            .invoker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .run(command.as_ref());

        let (to, order) = {
            let guard = machine
                .lock()
                .map_err(|_| CommandError::Poisoned(order_id.clone()))?;
            (guard.state(), guard.order().clone())
        };

        if from == to {
            self.dispatcher.notify_categorized(
                AlertCategory::TransitionRejected,
                "Action not allowed",
                format!("Order {order_id} cannot be {} while {from}", kind.label()),
            );
            return Ok(TransitionReport {
                order_id: order_id.clone(),
                kind,
                from,
                to,
                outcome,
                restocked: Vec::new(),
                failures: Vec::new(),
            });
        }

        if let Err(e) = self.orders.persist(&order) {
            // Keep the cached machine in line with what is stored.
            if let Ok(mut guard) = machine.lock() {
                let _ = guard.rebind(from.as_str());
            }
            return Err(e.into());
        }

        self.dispatcher.notify_categorized(
            AlertCategory::TransitionApplied,
            "Order updated",
            format!("Order {order_id} {}", kind.label()),
        );

        let mut restocked = Vec::new();
        let mut failures = Vec::new();
        if to == OrderState::Canceled {
            // The order is already stored as canceled; a retry cannot restock,
            // so every line is attempted.
            for item in order.items() {
                match self.inventory.restock(&item.sku, item.quantity) {
                    Ok(result) => restocked.push((item.sku.clone(), result)),
                    Err(e) => {
                        error!(
                            %order_id,
                            sku = %item.sku,
                            quantity = item.quantity,
                            error = %e,
                            "line not returned to stock"
                        );
                        failures.push((item.sku.clone(), e));
                    }
                }
            }
            info!(
                %order_id,
                lines = restocked.len(),
                failed = failures.len(),
                "stock returned for canceled order"
            );
        }

        Ok(TransitionReport {
            order_id: order_id.clone(),
            kind,
            from,
            to,
            outcome,
            restocked,
            failures,
        })
    }

    /// Current view of an order (cached machine first, then the store).
    pub fn order(&self, order_id: &OrderId) -> Result<Option<Order>, WorkflowError> {
        let cached = self.machines_lock().get(order_id).cloned();
        match cached {
            Some(machine) => {
                let guard = machine
                    .lock()
                    .map_err(|_| CommandError::Poisoned(order_id.clone()))?;
                Ok(Some(guard.order().clone()))
            }
            None => Ok(self.orders.find(order_id)?),
        }
    }

    /// Executed commands, newest first.
    ///
    /// Records what ran, not what was stored: a command whose transition was
    /// rolled back after a failed persist stays listed.
    pub fn history(&self) -> Vec<ExecutedCommand> {
        self.invoker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history()
            .cloned()
            .collect()
    }

    fn machine_for(&self, order_id: &OrderId) -> Result<SharedStateMachine, WorkflowError> {
        if let Some(machine) = self.machines_lock().get(order_id) {
            return Ok(machine.clone());
        }

        let order = self
            .orders
            .find(order_id)?
            .ok_or_else(|| WorkflowError::UnknownOrder(order_id.clone()))?;
        let seed = self
            .orders
            .find_state_seed(order_id)?
            .ok_or_else(|| WorkflowError::UnknownOrder(order_id.clone()))?;
        let machine = shared(OrderStateMachine::from_seed(order, &seed)?);

        Ok(self
            .machines_lock()
            .entry(order_id.clone())
            .or_insert(machine)
            .clone())
    }

    fn machines_lock(&self) -> std::sync::MutexGuard<'_, HashMap<OrderId, SharedStateMachine>> {
        self.machines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for OrderWorkflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderWorkflow")
            .field("cached_machines", &self.machines_lock().len())
            .finish_non_exhaustive()
    }
}

fn current_state(
    order_id: &OrderId,
    machine: &SharedStateMachine,
) -> Result<OrderState, CommandError> {
    machine
        .lock()
        .map(|guard| guard.state())
        .map_err(|_| CommandError::Poisoned(order_id.clone()))
}
