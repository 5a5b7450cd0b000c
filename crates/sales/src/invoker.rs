//! Command invoker: the single recovery boundary for order transitions.

use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use tracing::{error, info};

use storefront_core::OrderId;

use crate::command::TransitionCommand;
use crate::state_machine::Transition;

/// History entry for a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub name: &'static str,
    pub order_id: OrderId,
    pub executed_at: DateTime<Utc>,
}

/// What happened when the invoker ran a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Succeeded {
        command: ExecutedCommand,
        transition: Transition,
    },
    Failed {
        command: &'static str,
        order_id: OrderId,
        reason: String,
    },
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded { .. })
    }

    /// The observed transition, if the command ran.
    pub fn transition(&self) -> Option<Transition> {
        match self {
            CommandOutcome::Succeeded { transition, .. } => Some(*transition),
            CommandOutcome::Failed { .. } => None,
        }
    }
}

/// Executes transition commands and keeps an append-only history.
///
/// Errors and panics raised by a command are logged and turned into
/// [`CommandOutcome::Failed`]; they never reach the caller.
#[derive(Debug, Default)]
pub struct CommandInvoker {
    history: Vec<ExecutedCommand>,
}

impl CommandInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&mut self, command: &dyn TransitionCommand) -> CommandOutcome {
        let name = command.name();
        let order_id = command.order_id().clone();

        let result = panic::catch_unwind(AssertUnwindSafe(|| command.execute()));

        let reason = match result {
            Ok(Ok(transition)) => {
                let executed = ExecutedCommand {
                    name,
                    order_id,
                    executed_at: Utc::now(),
                };
                info!(
                    command = name,
                    order_id = %executed.order_id,
                    applied = transition.is_applied(),
                    state = %transition.state(),
                    "command executed"
                );
                self.history.push(executed.clone());
                return CommandOutcome::Succeeded {
                    command: executed,
                    transition,
                };
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(command = name, order_id = %order_id, reason = %reason, "command execution failed");
        CommandOutcome::Failed {
            command: name,
            order_id,
            reason,
        }
    }

    /// Most recently executed command.
    pub fn last(&self) -> Option<&ExecutedCommand> {
        self.history.last()
    }

    /// Executed commands, newest first.
    pub fn history(&self) -> impl Iterator<Item = &ExecutedCommand> {
        self.history.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_support::machine;
    use crate::command::{CancelOrder, CommandError, DeliverOrder, ProcessOrder, ShipOrder};
    use crate::order::OrderState;

    struct Exploding {
        order_id: OrderId,
    }

    impl TransitionCommand for Exploding {
        fn name(&self) -> &'static str {
            "Exploding"
        }

        fn order_id(&self) -> &OrderId {
            &self.order_id
        }

        fn execute(&self) -> Result<Transition, CommandError> {
            panic!("wire came loose")
        }
    }

    #[test]
    fn successful_commands_are_recorded_newest_first() {
        let id = OrderId::new("ORD-INV00001");
        let sm = machine(id.as_str());
        let mut invoker = CommandInvoker::new();

        assert!(invoker.run(&ProcessOrder::new(id.clone(), sm.clone())).is_success());
        assert!(invoker.run(&ShipOrder::new(id.clone(), sm.clone())).is_success());
        assert!(invoker.run(&DeliverOrder::new(id.clone(), sm.clone())).is_success());

        let names: Vec<_> = invoker.history().map(|c| c.name).collect();
        assert_eq!(names, vec!["Deliver order", "Ship order", "Process order"]);
        assert_eq!(invoker.last().map(|c| c.name), Some("Deliver order"));
        assert_eq!(invoker.len(), 3);
        assert_eq!(sm.lock().unwrap().state(), OrderState::Delivered);
    }

    #[test]
    fn ignored_transition_still_counts_as_executed() {
        let id = OrderId::new("ORD-INV00002");
        let sm = machine(id.as_str());
        let mut invoker = CommandInvoker::new();

        let outcome = invoker.run(&ShipOrder::new(id, sm));
        assert_eq!(
            outcome.transition(),
            Some(Transition::Ignored {
                state: OrderState::Pending
            })
        );
        assert_eq!(invoker.len(), 1);
    }

    #[test]
    fn failing_command_is_contained_and_not_recorded() {
        let sm = machine("ORD-INV00003");
        let mut invoker = CommandInvoker::new();

        let outcome = invoker.run(&CancelOrder::new(OrderId::new("ORD-OTHER001"), sm.clone()));

        match outcome {
            CommandOutcome::Failed {
                command,
                order_id,
                reason,
            } => {
                assert_eq!(command, "Cancel order");
                assert_eq!(order_id, OrderId::new("ORD-OTHER001"));
                assert!(reason.contains("ORD-INV00003"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(invoker.is_empty());
        assert_eq!(sm.lock().unwrap().state(), OrderState::Pending);
    }

    #[test]
    fn panicking_command_is_contained() {
        let mut invoker = CommandInvoker::new();
        let outcome = invoker.run(&Exploding {
            order_id: OrderId::new("ORD-BOOM0001"),
        });

        assert_eq!(
            outcome,
            CommandOutcome::Failed {
                command: "Exploding",
                order_id: OrderId::new("ORD-BOOM0001"),
                reason: "panicked: wire came loose".to_string(),
            }
        );
        assert!(invoker.last().is_none());
    }

    #[test]
    fn poisoned_machine_fails_without_panicking() {
        let id = OrderId::new("ORD-INV00004");
        let sm = machine(id.as_str());

        let poisoner = sm.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison");
        })
        .join();

        let mut invoker = CommandInvoker::new();
        let outcome = invoker.run(&ProcessOrder::new(id, sm));
        assert!(!outcome.is_success());
        assert!(invoker.is_empty());
    }
}
