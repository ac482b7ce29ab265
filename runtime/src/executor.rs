//! Executor - Serialized Dispatch Engine
//!
//! The executor owns the flow tree. It drains the coordinator's queue one
//! envelope at a time, so every dispatch pass (and the tree mutations it
//! causes) completes before the next one starts. Nothing else ever touches
//! the tree.

use crate::command::ErasedCommand;
use crate::coordinator::{Coordinator, Shared};
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot};
use tributary_core::{
    CoordinatorConfig, Dispatcher, FlowHandle, FlowRef, Middleware, NavigationRequest, Topology,
    TopologyNode,
};
use tributary_flow::{Action, Tree};

/// Unit of work queued on the coordinator.
pub(crate) enum Envelope {
    Action(Box<dyn Action>),
    Command(Box<dyn ErasedCommand>),
    Inspect(oneshot::Sender<Topology>),
}

pub(crate) struct Executor {
    tree: Tree<FlowHandle, FlowRef>,
    middlewares: Vec<Arc<dyn Middleware>>,
    config: CoordinatorConfig,
    shared: Weak<Shared>,
}

impl Executor {
    pub(crate) fn new(
        root: FlowHandle,
        middlewares: Vec<Arc<dyn Middleware>>,
        config: CoordinatorConfig,
        shared: Weak<Shared>,
    ) -> Self {
        let dispatcher: Weak<dyn Dispatcher> = shared.clone();
        root.bind(dispatcher);
        Executor {
            tree: Tree::new(root, |flow: &FlowHandle, node: &FlowRef| flow.node() == *node),
            middlewares,
            config,
            shared,
        }
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(envelope) = rx.recv().await {
            self.handle(envelope);
        }
        self.shutdown();
    }

    pub(crate) fn run_blocking(mut self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(envelope) = rx.blocking_recv() {
            self.handle(envelope);
        }
        self.shutdown();
    }

    fn shutdown(&self) {
        tracing::debug!(
            tributary.coordinator = %self.config.label,
            flows = self.tree.len(),
            "Coordinator released; executor stopped"
        );
    }

    fn handle(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Action(action) => self.process_action(action.as_ref()),
            Envelope::Command(command) => self.execute_command(command.as_ref()),
            Envelope::Inspect(reply) => {
                let _ = reply.send(self.topology());
            }
        }
    }

    fn dispatcher(&self) -> Weak<dyn Dispatcher> {
        self.shared.clone()
    }

    fn process_action(&mut self, action: &dyn Action) {
        let span = self.config.span_per_dispatch.then(|| {
            tracing::debug_span!(
                "Dispatch",
                tributary.coordinator = %self.config.label,
                tributary.action = action.name()
            )
        });
        let _entered = span.as_ref().map(|span| span.enter());

        for middleware in &self.middlewares {
            if catch_unwind(AssertUnwindSafe(|| middleware.will_process(action))).is_err() {
                tracing::error!(tributary.action = action.name(), "Middleware panicked in will_process");
            }
        }

        // Flows present when the pass began; creations are reached next pass.
        let visit: Vec<FlowHandle> = self.tree.iter().map(|(_, flow)| flow.clone()).collect();
        let mut removed = HashSet::new();

        for flow in visit {
            if removed.contains(&flow.node()) {
                continue;
            }
            let request = match catch_unwind(AssertUnwindSafe(|| flow.process(action))) {
                Ok(request) => request,
                Err(_) => {
                    tracing::error!(
                        tributary.flow = %flow.id(),
                        tributary.action = action.name(),
                        "Flow panicked while processing action"
                    );
                    continue;
                }
            };
            if let Some(request) = request {
                if !request.is_empty() {
                    removed.extend(self.apply(&request));
                }
            }
        }

        for middleware in &self.middlewares {
            if catch_unwind(AssertUnwindSafe(|| middleware.did_process(action))).is_err() {
                tracing::error!(tributary.action = action.name(), "Middleware panicked in did_process");
            }
        }
    }

    /// Apply deletions, then creations. Returns every node removed.
    fn apply(&mut self, request: &NavigationRequest) -> Vec<FlowRef> {
        let mut removed = Vec::new();

        for node in &request.deletions {
            let Some(position) = self.tree.search(node) else {
                tracing::debug!(tributary.flow = %node, "Deletion target not in tree; skipped");
                continue;
            };
            if position == self.tree.root() {
                tracing::warn!(tributary.flow = %node, "Refusing to delete the root flow");
                continue;
            }
            for flow in self.tree.remove(position) {
                flow.unbind();
                removed.push(flow.node());
            }
        }

        for (parent, child) in &request.creations {
            if self.tree.search(&child.node()).is_some() {
                tracing::warn!(
                    tributary.flow = %child.id(),
                    "Flow already attached; creation dropped"
                );
                continue;
            }
            let Some(position) = self.tree.search(parent) else {
                tracing::debug!(
                    tributary.flow = %child.id(),
                    tributary.parent = %parent,
                    "Parent not in tree; creation dropped"
                );
                continue;
            };
            if self.tree.add(position, child.clone()).is_some() {
                child.bind(self.dispatcher());
                tracing::debug!(
                    tributary.flow = %child.id(),
                    tributary.parent = %parent,
                    "Flow attached"
                );
            }
        }

        removed
    }

    fn execute_command(&mut self, command: &dyn ErasedCommand) {
        // Still runs while the queue drains after the last owner is gone.
        let coordinator =
            Coordinator::borrowed(self.shared.clone(), Arc::from(self.config.label.as_str()));

        let target = command.target();
        let matching: Vec<FlowHandle> = self
            .tree
            .iter()
            .filter(|(_, flow)| flow.state_type() == target)
            .map(|(_, flow)| flow.clone())
            .collect();

        let mut executed = 0usize;
        for flow in &matching {
            match catch_unwind(AssertUnwindSafe(|| command.apply(flow, &coordinator))) {
                Ok(true) => executed += 1,
                Ok(false) => {}
                Err(_) => tracing::error!(
                    tributary.command = command.label(),
                    tributary.flow = %flow.id(),
                    "Command panicked"
                ),
            }
        }

        if executed == 0 && self.config.log_unmatched_commands {
            tracing::debug!(
                tributary.command = command.label(),
                tributary.state_type = %target,
                "Command matched no flow"
            );
        }
    }

    fn topology(&self) -> Topology {
        let mut topology = Topology::new(self.config.label.clone());
        for (position, flow) in self.tree.iter() {
            topology.nodes.push(TopologyNode {
                node: flow.node(),
                id: flow.id().clone(),
                state_type: flow.state_type().name().to_string(),
                parent: self
                    .tree
                    .parent(position)
                    .and_then(|parent| self.tree.get(parent))
                    .map(FlowHandle::node),
                depth: self.tree.depth(position).unwrap_or_default(),
            });
        }
        topology
    }
}
