//! Tributary facade crate.
//!
//! Re-exports the flow tree, core and runtime crates behind a single entry
//! point. Applications usually need only `use tributary::prelude::*;`.

pub use tributary_core as core;
pub use tributary_flow as flow;
pub use tributary_runtime as runtime;

pub use tributary_core::{
    CoordinatorConfig, DeliveryContext, Flow, FlowHandle, FlowId, FlowRef, Middleware,
    NavigationPerformer, NavigationRequest, NavigationResolver, Subscriber, Topology,
    TracingMiddleware,
};
pub use tributary_flow::{Action, NavigationIntent, State, action, navigation_intent};
pub use tributary_runtime::{Command, Coordinator, command_fn};

pub mod prelude {
    pub use tributary_core::prelude::*;
    pub use tributary_runtime::prelude::*;
}
