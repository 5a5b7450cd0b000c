//! Order lifecycle state machine.
//!
//! ```text
//! PENDING ──process──▶ PROCESSING ──ship──▶ SHIPPED ──deliver──▶ DELIVERED
//!    │                     │
//!    └──────cancel─────────┴──────────────▶ CANCELED
//! ```
//!
//! Events that are not legal for the current state are silent no-ops: the
//! operations are driven from UI buttons that are already disabled for
//! invalid transitions. Callers that care can inspect the returned
//! [`Transition`].

use tracing::{debug, error, trace};

use storefront_core::{DomainResult, OrderId};

use crate::order::{Order, OrderState};

/// Inputs of the order state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEvent {
    Process,
    Ship,
    Deliver,
    Cancel,
}

impl OrderEvent {
    pub const ALL: [OrderEvent; 4] = [
        OrderEvent::Process,
        OrderEvent::Ship,
        OrderEvent::Deliver,
        OrderEvent::Cancel,
    ];
}

impl OrderState {
    /// Transition table. `None` means the event is ignored in this state.
    pub fn on(self, event: OrderEvent) -> Option<OrderState> {
        match (self, event) {
            (OrderState::Pending, OrderEvent::Process) => Some(OrderState::Processing),
            (OrderState::Pending, OrderEvent::Cancel) => Some(OrderState::Canceled),
            (OrderState::Processing, OrderEvent::Ship) => Some(OrderState::Shipped),
            (OrderState::Processing, OrderEvent::Cancel) => Some(OrderState::Canceled),
            (OrderState::Shipped, OrderEvent::Deliver) => Some(OrderState::Delivered),
            _ => None,
        }
    }
}

/// Result of firing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { from: OrderState, to: OrderState },
    Ignored { state: OrderState },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }

    /// State after the event.
    pub fn state(&self) -> OrderState {
        match *self {
            Transition::Applied { to, .. } => to,
            Transition::Ignored { state } => state,
        }
    }
}

/// Per-order state machine. Owns the order it drives.
#[derive(Debug, Clone)]
pub struct OrderStateMachine {
    order: Order,
    handler: OrderState,
}

impl OrderStateMachine {
    pub fn new(order: Order) -> Self {
        let handler = order.state();
        Self { order, handler }
    }

    /// Build a machine from a persisted state name.
    ///
    /// Fails with `UnknownState` if `seed` is not a known state.
    pub fn from_seed(mut order: Order, seed: &str) -> DomainResult<Self> {
        let state = seed.parse::<OrderState>().inspect_err(|e| {
            error!(order_id = %order.id(), seed, error = %e, "refusing to load order with unknown state");
        })?;
        order.set_state(state);
        Ok(Self::new(order))
    }

    /// Resynchronize with a persisted state name.
    ///
    /// On an unknown name the error is logged and the last valid handler stays
    /// in place.
    pub fn rebind(&mut self, state_name: &str) -> DomainResult<OrderState> {
        match state_name.parse::<OrderState>() {
            Ok(state) => {
                self.order.set_state(state);
                self.reload();
                Ok(state)
            }
            Err(e) => {
                error!(
                    order_id = %self.order.id(),
                    state_name,
                    retained = %self.handler,
                    "unknown order state; keeping current handler"
                );
                Err(e)
            }
        }
    }

    pub fn process(&mut self) -> Transition {
        self.fire(OrderEvent::Process)
    }

    pub fn ship(&mut self) -> Transition {
        self.fire(OrderEvent::Ship)
    }

    pub fn deliver(&mut self) -> Transition {
        self.fire(OrderEvent::Deliver)
    }

    pub fn cancel(&mut self) -> Transition {
        self.fire(OrderEvent::Cancel)
    }

    pub fn fire(&mut self, event: OrderEvent) -> Transition {
        let from = self.handler;
        match from.on(event) {
            Some(to) => {
                self.order.set_state(to);
                self.reload();
                debug!(order_id = %self.order.id(), %from, %to, ?event, "order transitioned");
                Transition::Applied { from, to }
            }
            None => {
                trace!(order_id = %self.order.id(), state = %from, ?event, "event ignored");
                Transition::Ignored { state: from }
            }
        }
    }

    pub fn state(&self) -> OrderState {
        self.handler
    }

    pub fn is_terminal(&self) -> bool {
        self.handler.is_terminal()
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn order_id(&self) -> &OrderId {
        self.order.id()
    }

    pub fn into_order(self) -> Order {
        self.order
    }

    fn reload(&mut self) {
        self.handler = self.order.state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{LineItem, OrderBuilder};
    use proptest::prelude::*;
    use storefront_core::{DomainError, Sku, UserId};

    fn test_order() -> Order {
        OrderBuilder::new(UserId::new(), OrderId::new("ORD-TEST0001"))
            .item(LineItem::new(Sku::new("A"), "Cargo Pants (32 - Khaki)", 2, 4_000))
            .shipping_address("1 Main St")
            .payment_method("card")
            .build()
            .unwrap()
    }

    #[test]
    fn happy_path_pending_to_delivered() {
        let mut machine = OrderStateMachine::new(test_order());

        assert_eq!(
            machine.process(),
            Transition::Applied {
                from: OrderState::Pending,
                to: OrderState::Processing
            }
        );
        assert!(machine.ship().is_applied());
        assert!(machine.deliver().is_applied());
        assert_eq!(machine.state(), OrderState::Delivered);
        assert_eq!(machine.order().state(), OrderState::Delivered);
        assert!(machine.is_terminal());
    }

    #[test]
    fn cancel_from_pending_then_ship_is_noop() {
        let mut machine = OrderStateMachine::new(test_order());

        assert!(machine.cancel().is_applied());
        assert_eq!(machine.state(), OrderState::Canceled);

        assert_eq!(
            machine.ship(),
            Transition::Ignored {
                state: OrderState::Canceled
            }
        );
        assert_eq!(machine.order().state(), OrderState::Canceled);
    }

    #[test]
    fn shipped_orders_cannot_be_canceled() {
        let mut machine = OrderStateMachine::new(test_order());
        machine.process();
        machine.ship();

        assert!(!machine.cancel().is_applied());
        assert_eq!(machine.state(), OrderState::Shipped);
    }

    #[test]
    fn invalid_events_leave_order_untouched() {
        let mut machine = OrderStateMachine::new(test_order());
        let before = machine.order().clone();

        assert!(!machine.ship().is_applied());
        assert!(!machine.deliver().is_applied());
        assert_eq!(machine.order(), &before);

        machine.process();
        let before = machine.order().clone();
        assert!(!machine.process().is_applied());
        assert!(!machine.deliver().is_applied());
        assert_eq!(machine.order(), &before);
    }

    #[test]
    fn transition_table_matches_expected_graph() {
        use OrderEvent::*;
        use OrderState::*;

        let legal = [
            (Pending, Process, Processing),
            (Pending, Cancel, Canceled),
            (Processing, Ship, Shipped),
            (Processing, Cancel, Canceled),
            (Shipped, Deliver, Delivered),
        ];

        for state in OrderState::ALL {
            for event in OrderEvent::ALL {
                let expected = legal
                    .iter()
                    .find(|(s, e, _)| *s == state && *e == event)
                    .map(|(_, _, to)| *to);
                assert_eq!(state.on(event), expected, "{state} on {event:?}");
            }
        }
    }

    #[test]
    fn from_seed_restores_persisted_state() {
        let mut machine = OrderStateMachine::from_seed(test_order(), "PROCESSING").unwrap();
        assert_eq!(machine.state(), OrderState::Processing);
        assert!(machine.ship().is_applied());
    }

    #[test]
    fn from_seed_rejects_unknown_state() {
        let err = OrderStateMachine::from_seed(test_order(), "ON_HOLD").unwrap_err();
        assert_eq!(err, DomainError::UnknownState("ON_HOLD".to_string()));
    }

    #[test]
    fn rebind_to_unknown_state_keeps_last_valid_handler() {
        let mut machine = OrderStateMachine::new(test_order());
        machine.process();

        let err = machine.rebind("in-transit").unwrap_err();
        assert!(matches!(err, DomainError::UnknownState(name) if name == "in-transit"));
        assert_eq!(machine.state(), OrderState::Processing);

        // Still dispatches against the retained handler.
        assert!(machine.ship().is_applied());
    }

    #[test]
    fn rebind_to_known_state_resynchronizes() {
        let mut machine = OrderStateMachine::new(test_order());
        assert_eq!(machine.rebind("SHIPPED").unwrap(), OrderState::Shipped);
        assert_eq!(machine.order().state(), OrderState::Shipped);
        assert!(machine.deliver().is_applied());
    }

    fn any_event() -> impl Strategy<Value = OrderEvent> {
        prop::sample::select(OrderEvent::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every visited state sequence is a path in the transition
        /// graph, and terminal states are never left.
        #[test]
        fn visited_states_follow_the_graph(events in prop::collection::vec(any_event(), 0..40)) {
            let mut machine = OrderStateMachine::new(test_order());
            let mut current = machine.state();

            for event in events {
                let transition = machine.fire(event);
                match transition {
                    Transition::Applied { from, to } => {
                        prop_assert_eq!(from, current);
                        prop_assert_eq!(current.on(event), Some(to));
                        prop_assert!(!current.is_terminal());
                        current = to;
                    }
                    Transition::Ignored { state } => {
                        prop_assert_eq!(state, current);
                        prop_assert_eq!(current.on(event), None);
                    }
                }
                prop_assert_eq!(machine.state(), current);
                prop_assert_eq!(machine.order().state(), current);
            }
        }
    }
}
