//! # Coordinator: Serialized Dispatch Entry Point
//!
//! The `Coordinator` owns the flow tree (through its executor) and the
//! middleware chain. Every `dispatch` and `dispatch_command` call enqueues
//! onto one ordered queue and returns immediately; the executor runs each
//! pass to completion before starting the next.
//!
//! ## Example
//!
//! ```rust,ignore
//! let root = Flow::with_resolver("home", Home::default(), resolve_home);
//! let coordinator = Coordinator::builder(&root)
//!     .middleware(TracingMiddleware::default())
//!     .spawn();
//!
//! coordinator.dispatch(Increment);
//! coordinator.dispatch(OpenDetail { id: 5 });
//! ```

use crate::command::Command;
use crate::executor::{Envelope, Executor};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tributary_core::{CoordinatorConfig, Dispatcher, FlowHandle, Middleware, Topology};
use tributary_flow::Action;

pub(crate) struct Shared {
    tx: mpsc::UnboundedSender<Envelope>,
    label: Arc<str>,
}

impl Shared {
    fn send(&self, envelope: Envelope) -> bool {
        let sent = self.tx.send(envelope).is_ok();
        if !sent {
            tracing::debug!(tributary.coordinator = %self.label, "Executor stopped; dispatch dropped");
        }
        sent
    }
}

impl Dispatcher for Shared {
    fn dispatch_boxed(&self, action: Box<dyn Action>) -> bool {
        self.send(Envelope::Action(action))
    }
}

#[derive(Clone)]
enum Link {
    /// Keeps the engine alive.
    Owned(Arc<Shared>),
    /// Handed to commands; stops working once every owner is gone.
    Borrowed(Weak<Shared>),
}

/// Handle to a running dispatch engine. Clones share the same engine; the
/// engine stops once every clone is dropped and its queue is drained.
///
/// The handle passed to [`Command::execute`] does not keep the engine alive:
/// while queued work drains after the last clone was dropped, its dispatches
/// are logged and dropped.
#[derive(Clone)]
pub struct Coordinator {
    link: Link,
    label: Arc<str>,
}

impl Coordinator {
    /// Start a coordinator with `root` as the tree root.
    pub fn new(root: impl Into<FlowHandle>, middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self::builder(root).middlewares(middlewares).spawn()
    }

    pub fn builder(root: impl Into<FlowHandle>) -> CoordinatorBuilder {
        CoordinatorBuilder {
            root: root.into(),
            middlewares: Vec::new(),
            config: CoordinatorConfig::default(),
        }
    }

    pub(crate) fn borrowed(shared: Weak<Shared>, label: Arc<str>) -> Self {
        Coordinator {
            link: Link::Borrowed(shared),
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn send(&self, envelope: Envelope) -> bool {
        match &self.link {
            Link::Owned(shared) => shared.send(envelope),
            Link::Borrowed(weak) => match weak.upgrade() {
                Some(shared) => shared.send(envelope),
                None => {
                    tracing::debug!(
                        tributary.coordinator = %self.label,
                        "Coordinator released; dispatch dropped"
                    );
                    false
                }
            },
        }
    }

    /// Enqueue `action` for a full pass over the tree.
    pub fn dispatch<A: Action>(&self, action: A) {
        self.send(Envelope::Action(Box::new(action)));
    }

    /// Enqueue an already boxed action.
    pub fn dispatch_boxed(&self, action: Box<dyn Action>) {
        self.send(Envelope::Action(action));
    }

    /// Enqueue `command` for every flow whose state type is `C::State`.
    pub fn dispatch_command<C: Command>(&self, command: C) {
        self.send(Envelope::Command(Box::new(command)));
    }

    /// Snapshot of the tree taken after all previously enqueued work.
    ///
    /// Returns `None` when the executor is no longer running.
    pub async fn topology(&self) -> Option<Topology> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Envelope::Inspect(tx)) {
            return None;
        }
        rx.await.ok()
    }

    /// Wait until everything enqueued so far has been processed.
    pub async fn flush(&self) -> bool {
        self.topology().await.is_some()
    }

    pub fn is_running(&self) -> bool {
        match &self.link {
            Link::Owned(shared) => !shared.tx.is_closed(),
            Link::Borrowed(weak) => weak.upgrade().is_some_and(|shared| !shared.tx.is_closed()),
        }
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("label", &self.label)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    root: FlowHandle,
    middlewares: Vec<Arc<dyn Middleware>>,
    config: CoordinatorConfig,
}

impl CoordinatorBuilder {
    /// Append a middleware; hooks run in registration order.
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append a middleware the caller keeps a handle to.
    pub fn shared_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn middlewares(mut self, middlewares: impl IntoIterator<Item = Arc<dyn Middleware>>) -> Self {
        self.middlewares.extend(middlewares);
        self
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    fn prepare(self) -> (Coordinator, Executor, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let label: Arc<str> = Arc::from(self.config.label.as_str());
        let shared = Arc::new(Shared {
            tx,
            label: label.clone(),
        });
        tracing::debug!(
            tributary.coordinator = %self.config.label,
            tributary.root = %self.root.id(),
            middlewares = self.middlewares.len(),
            "Starting coordinator"
        );
        let executor = Executor::new(
            self.root,
            self.middlewares,
            self.config,
            Arc::downgrade(&shared),
        );
        let coordinator = Coordinator {
            link: Link::Owned(shared),
            label,
        };
        (coordinator, executor, rx)
    }

    /// Run the executor on the current tokio runtime, or on a dedicated
    /// thread when called outside of one.
    pub fn spawn(self) -> Coordinator {
        match Handle::try_current() {
            Ok(handle) => self.spawn_on(&handle),
            Err(_) => self.spawn_thread(),
        }
    }

    /// Run the executor as a task on `handle`.
    pub fn spawn_on(self, handle: &Handle) -> Coordinator {
        let (coordinator, executor, rx) = self.prepare();
        handle.spawn(executor.run(rx));
        coordinator
    }

    fn spawn_thread(self) -> Coordinator {
        let (coordinator, executor, rx) = self.prepare();
        let spawned = std::thread::Builder::new()
            .name(format!("coordinator:{}", coordinator.label()))
            .spawn(move || executor.run_blocking(rx));
        if let Err(e) = spawned {
            tracing::error!(
                tributary.coordinator = %coordinator.label(),
                error = %e,
                "Failed to spawn coordinator thread"
            );
        }
        coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::{Flow, State};

    #[derive(Debug, Clone, Default)]
    struct Idle;

    impl State for Idle {
        fn react(&mut self, _action: &dyn Action) {}
    }

    #[derive(Debug)]
    struct Nudge;

    tributary_flow::action!(Nudge);

    #[tokio::test]
    async fn test_borrowed_handle_follows_owner_lifetime() {
        let root = Flow::new("root", Idle);
        let owner = Coordinator::builder(&root).spawn();
        let Link::Owned(shared) = &owner.link else {
            panic!("builder returns an owning handle");
        };
        let borrowed = Coordinator::borrowed(Arc::downgrade(shared), Arc::from("main"));

        assert!(borrowed.is_running());
        assert!(borrowed.send(Envelope::Action(Box::new(Nudge))));
        assert!(borrowed.flush().await);

        drop(owner);
        assert!(!borrowed.is_running());
        assert!(!borrowed.send(Envelope::Action(Box::new(Nudge))));
        assert!(borrowed.topology().await.is_none());
    }
}
