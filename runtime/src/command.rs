//! Command - Typed Operations on Flows
//!
//! A command is bound to one state type. The coordinator runs it against
//! every flow in the tree whose state type is exactly that type, in
//! depth-first order, and against nothing else.

use crate::coordinator::Coordinator;
use std::any::type_name;
use std::marker::PhantomData;
use tributary_core::{Flow, FlowHandle, StateType};
use tributary_flow::{State, short_type_name};

/// Operation executed directly against flows holding `Self::State`.
///
/// The coordinator is passed so the command can dispatch follow-up actions
/// or commands; those run after the current pass.
pub trait Command: Send + Sync + 'static {
    type State: State;

    fn execute(&self, flow: &Flow<Self::State>, coordinator: &Coordinator);

    /// Readable name used in logs.
    fn name(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// Closure-backed command built by [`command_fn`].
pub struct FnCommand<S, F> {
    run: F,
    _state: PhantomData<fn(&S)>,
}

/// Wrap a closure as a command bound to state type `S`.
///
/// ```rust,ignore
/// coordinator.dispatch_command(command_fn::<Counter, _>(|flow, _| {
///     flow.mutate(|counter| counter.count = 0);
/// }));
/// ```
pub fn command_fn<S, F>(run: F) -> FnCommand<S, F>
where
    S: State,
    F: Fn(&Flow<S>, &Coordinator) + Send + Sync + 'static,
{
    FnCommand {
        run,
        _state: PhantomData,
    }
}

impl<S, F> Command for FnCommand<S, F>
where
    S: State,
    F: Fn(&Flow<S>, &Coordinator) + Send + Sync + 'static,
{
    type State = S;

    fn execute(&self, flow: &Flow<S>, coordinator: &Coordinator) {
        (self.run)(flow, coordinator)
    }

    fn name(&self) -> &'static str {
        "FnCommand"
    }
}

/// Command with its state type erased, as queued by the coordinator.
pub(crate) trait ErasedCommand: Send + Sync {
    fn target(&self) -> StateType;
    fn label(&self) -> &'static str;
    /// Run against `flow` if its state type matches. Returns whether it ran.
    fn apply(&self, flow: &FlowHandle, coordinator: &Coordinator) -> bool;
}

impl<C: Command> ErasedCommand for C {
    fn target(&self) -> StateType {
        StateType::of::<C::State>()
    }

    fn label(&self) -> &'static str {
        Command::name(self)
    }

    fn apply(&self, flow: &FlowHandle, coordinator: &Coordinator) -> bool {
        if flow.state_type() != self.target() {
            return false;
        }
        match flow.downcast::<C::State>() {
            Some(flow) => {
                self.execute(&flow, coordinator);
                true
            }
            None => false,
        }
    }
}
