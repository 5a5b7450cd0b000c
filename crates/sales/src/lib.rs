//! Sales orders: the order model, its lifecycle state machine, and the
//! transition commands that drive it.
//!
//! Pure domain logic. Persistence is reached through [`OrderRepository`];
//! notifications and inventory side effects are orchestrated by
//! `storefront-infra`.

pub mod command;
pub mod invoker;
pub mod order;
pub mod repository;
pub mod state_machine;

pub use command::{
    shared, CancelOrder, CommandError, DeliverOrder, ProcessOrder, SharedStateMachine, ShipOrder,
    TransitionCommand, TransitionKind,
};
pub use invoker::{CommandInvoker, CommandOutcome, ExecutedCommand};
pub use order::{LineItem, Order, OrderBuilder, OrderState};
pub use repository::OrderRepository;
pub use state_machine::{OrderEvent, OrderStateMachine, Transition};
