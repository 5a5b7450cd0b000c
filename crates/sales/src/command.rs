//! Order transition commands.
//!
//! A command represents **intent**: "process order ORD-1A2B3C4D". It is bound
//! to the order it targets and to that order's state machine, and carries no
//! other data. Executing a command whose event is not legal for the current
//! state is a silent no-op, same as calling the state machine directly.
//!
//! Commands are not undoable: no inverse exists for a shipped parcel or a
//! delivered order.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use storefront_core::{DomainError, OrderId};

use crate::state_machine::{OrderEvent, OrderStateMachine, Transition};

/// State machine shared between the UI, the invoker and the workflow.
pub type SharedStateMachine = Arc<Mutex<OrderStateMachine>>;

pub fn shared(machine: OrderStateMachine) -> SharedStateMachine {
    Arc::new(Mutex::new(machine))
}

/// Reasons a command could not be executed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// A previous holder of the state machine lock panicked.
    #[error("state machine for order {0} is poisoned")]
    Poisoned(OrderId),

    #[error("command targets order {expected} but is bound to the machine of {actual}")]
    OrderMismatch { expected: OrderId, actual: OrderId },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// An executable order transition.
pub trait TransitionCommand: Send + Sync {
    /// Human-readable command name (shown in history and logs).
    fn name(&self) -> &'static str;

    fn order_id(&self) -> &OrderId;

    /// Execute against the bound state machine.
    ///
    /// Returns the observed [`Transition`]; ignored events are `Ok`.
    fn execute(&self) -> Result<Transition, CommandError>;
}

impl<C> TransitionCommand for Box<C>
where
    C: TransitionCommand + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn order_id(&self) -> &OrderId {
        (**self).order_id()
    }

    fn execute(&self) -> Result<Transition, CommandError> {
        (**self).execute()
    }
}

fn fire_bound(
    order_id: &OrderId,
    machine: &SharedStateMachine,
    event: OrderEvent,
) -> Result<Transition, CommandError> {
    let mut guard = machine
        .lock()
        .map_err(|_| CommandError::Poisoned(order_id.clone()))?;

    if guard.order_id() != order_id {
        return Err(CommandError::OrderMismatch {
            expected: order_id.clone(),
            actual: guard.order_id().clone(),
        });
    }

    let transition = guard.fire(event);
    debug!(%order_id, ?event, applied = transition.is_applied(), "command executed");
    Ok(transition)
}

macro_rules! transition_command {
    ($(#[$meta:meta])* $name:ident, $event:expr, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            order_id: OrderId,
            machine: SharedStateMachine,
        }

        impl $name {
            pub fn new(order_id: OrderId, machine: SharedStateMachine) -> Self {
                Self { order_id, machine }
            }
        }

        impl TransitionCommand for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn order_id(&self) -> &OrderId {
                &self.order_id
            }

            fn execute(&self) -> Result<Transition, CommandError> {
                fire_bound(&self.order_id, &self.machine, $event)
            }
        }
    };
}

transition_command!(
    /// PENDING -> PROCESSING.
    ProcessOrder,
    OrderEvent::Process,
    "Process order"
);
transition_command!(
    /// PROCESSING -> SHIPPED.
    ShipOrder,
    OrderEvent::Ship,
    "Ship order"
);
transition_command!(
    /// SHIPPED -> DELIVERED.
    DeliverOrder,
    OrderEvent::Deliver,
    "Deliver order"
);
transition_command!(
    /// PENDING or PROCESSING -> CANCELED.
    CancelOrder,
    OrderEvent::Cancel,
    "Cancel order"
);

/// Which transition a UI action requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Process,
    Ship,
    Deliver,
    Cancel,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 4] = [
        TransitionKind::Process,
        TransitionKind::Ship,
        TransitionKind::Deliver,
        TransitionKind::Cancel,
    ];

    pub fn event(self) -> OrderEvent {
        match self {
            TransitionKind::Process => OrderEvent::Process,
            TransitionKind::Ship => OrderEvent::Ship,
            TransitionKind::Deliver => OrderEvent::Deliver,
            TransitionKind::Cancel => OrderEvent::Cancel,
        }
    }

    /// Past-tense label used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            TransitionKind::Process => "processed",
            TransitionKind::Ship => "shipped",
            TransitionKind::Deliver => "delivered",
            TransitionKind::Cancel => "canceled",
        }
    }

    pub fn command(
        self,
        order_id: OrderId,
        machine: SharedStateMachine,
    ) -> Box<dyn TransitionCommand> {
        match self {
            TransitionKind::Process => Box::new(ProcessOrder::new(order_id, machine)),
            TransitionKind::Ship => Box::new(ShipOrder::new(order_id, machine)),
            TransitionKind::Deliver => Box::new(DeliverOrder::new(order_id, machine)),
            TransitionKind::Cancel => Box::new(CancelOrder::new(order_id, machine)),
        }
    }
}

impl core::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::order::{LineItem, Order, OrderBuilder};
    use storefront_core::{Sku, UserId};

    pub fn order(id: &str) -> Order {
        OrderBuilder::new(UserId::new(), OrderId::new(id))
            .item(LineItem::new(Sku::new("HOODIE-S-GREY"), "Hoodie (S - Grey)", 1, 3_500))
            .shipping_address("42 Wallaby Way")
            .payment_method("card")
            .build()
            .unwrap()
    }

    pub fn machine(id: &str) -> SharedStateMachine {
        shared(OrderStateMachine::new(order(id)))
    }
}
