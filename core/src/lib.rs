//! Tributary Core - Flows, Subscriptions and Navigation
//!
//! A flow owns one typed state value. Subscribers observe it on delivery
//! contexts of their choosing; navigation intents are resolved into requests
//! describing tree mutations. The coordinator that applies them lives in
//! `tributary-runtime`.

pub mod config;
pub mod delivery;
pub mod error;
pub mod flow;
pub mod identity;
pub mod middleware;
pub mod navigation;
pub mod subscription;
pub mod telemetry;
pub mod topology;

pub use config::{CoordinatorConfig, Mode};
pub use delivery::DeliveryContext;
pub use error::ConfigError;
pub use flow::{AnyFlow, Dispatcher, Flow, FlowHandle};
pub use identity::{FlowId, FlowRef, StateType};
pub use middleware::Middleware;
pub use navigation::{NavigationPerformer, NavigationRequest, NavigationResolver};
pub use subscription::{Subscriber, SubscriptionHandle, SubscriptionRegistry};
pub use telemetry::TracingMiddleware;
pub use topology::{Topology, TopologyNode};
pub use tributary_flow::{Action, NavigationIntent, State};

pub mod prelude {
    pub use crate::config::CoordinatorConfig;
    pub use crate::delivery::DeliveryContext;
    pub use crate::flow::{Flow, FlowHandle};
    pub use crate::identity::{FlowId, FlowRef};
    pub use crate::middleware::Middleware;
    pub use crate::navigation::{NavigationPerformer, NavigationRequest, NavigationResolver};
    pub use crate::subscription::{Subscriber, SubscriptionHandle};
    pub use crate::telemetry::TracingMiddleware;
    pub use crate::topology::Topology;
    pub use tributary_flow::{Action, NavigationIntent, State, action, navigation_intent};
}
