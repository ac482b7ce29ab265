//! # Navigation: Intent Resolution Protocol
//!
//! A `NavigationIntent` is never applied to state. The flow that sees it asks
//! its resolver for a `NavigationRequest`, which describes the tree mutations
//! (creations and deletions) that realize the intent. The coordinator applies
//! them; subscribers perform them (screen transitions, etc.).

use crate::flow::{Flow, FlowHandle};
use crate::identity::FlowRef;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tributary_flow::{NavigationIntent, State};

/// Resolved description of a navigation.
pub struct NavigationRequest {
    pub from: FlowHandle,
    pub to: FlowHandle,
    /// `(parent, child)` pairs, applied in order.
    pub creations: Vec<(FlowRef, FlowHandle)>,
    /// Flows removed together with their subtrees. Applied before creations.
    pub deletions: Vec<FlowRef>,
    pub info: BTreeMap<String, Value>,
}

impl NavigationRequest {
    pub fn new(from: impl Into<FlowHandle>, to: impl Into<FlowHandle>) -> Self {
        NavigationRequest {
            from: from.into(),
            to: to.into(),
            creations: Vec::new(),
            deletions: Vec::new(),
            info: BTreeMap::new(),
        }
    }

    /// Attach `child` under the flow identified by `parent`.
    pub fn create(mut self, parent: impl Into<FlowRef>, child: impl Into<FlowHandle>) -> Self {
        self.creations.push((parent.into(), child.into()));
        self
    }

    /// Remove `flow` and its subtree.
    pub fn delete(mut self, flow: impl Into<FlowRef>) -> Self {
        self.deletions.push(flow.into());
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    /// `true` when applying this request changes nothing in the tree.
    pub fn is_empty(&self) -> bool {
        self.creations.is_empty() && self.deletions.is_empty()
    }
}

impl fmt::Debug for NavigationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationRequest")
            .field("from", &self.from.node())
            .field("to", &self.to.node())
            .field(
                "creations",
                &self
                    .creations
                    .iter()
                    .map(|(parent, child)| (*parent, child.node()))
                    .collect::<Vec<_>>(),
            )
            .field("deletions", &self.deletions)
            .field("info", &self.info)
            .finish()
    }
}

/// Turns an intent into a navigation request for one flow.
///
/// Returning `None` means "not actionable in this flow's current state".
pub trait NavigationResolver<S: State>: Send + Sync + 'static {
    fn resolve(&self, flow: &Flow<S>, intent: &dyn NavigationIntent) -> Option<NavigationRequest>;
}

impl<S, F> NavigationResolver<S> for F
where
    S: State,
    F: Fn(&Flow<S>, &dyn NavigationIntent) -> Option<NavigationRequest> + Send + Sync + 'static,
{
    fn resolve(&self, flow: &Flow<S>, intent: &dyn NavigationIntent) -> Option<NavigationRequest> {
        self(flow, intent)
    }
}

/// Capability to carry out a resolved navigation.
pub trait NavigationPerformer: Send + Sync {
    fn perform(&self, request: &NavigationRequest) {
        let _ = request;
    }
}
