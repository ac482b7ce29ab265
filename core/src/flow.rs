//! # Flow: Typed State Container
//!
//! A `Flow<S>` owns one state value of type `S`, a subscriber registry and an
//! optional navigation resolver. It processes one action at a time: plain
//! actions make the state react, navigation intents are resolved into
//! [`NavigationRequest`]s.
//!
//! `Flow` is a cheap clonable handle. The tree stores flows type-erased as
//! [`FlowHandle`]s; commands recover the typed flow with
//! [`FlowHandle::downcast`].

use crate::delivery::DeliveryContext;
use crate::identity::{FlowId, FlowRef, StateType};
use crate::navigation::{NavigationRequest, NavigationResolver};
use crate::subscription::{Subscriber, SubscriptionHandle, SubscriptionRegistry};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use tributary_flow::{Action, State};

/// Back-channel from a flow to the coordinator that owns it.
pub trait Dispatcher: Send + Sync + 'static {
    /// Enqueue `action` for a full dispatch pass. Returns `false` when the
    /// coordinator has stopped.
    fn dispatch_boxed(&self, action: Box<dyn Action>) -> bool;
}

struct FlowInner<S: State> {
    node: FlowRef,
    id: FlowId,
    state: Mutex<S>,
    resolver: Option<Box<dyn NavigationResolver<S>>>,
    subscribers: SubscriptionRegistry<S>,
    coordinator: RwLock<Option<Weak<dyn Dispatcher>>>,
}

/// Typed state container; one node of the flow tree.
pub struct Flow<S: State> {
    inner: Arc<FlowInner<S>>,
}

impl<S: State> Clone for Flow<S> {
    fn clone(&self) -> Self {
        Flow {
            inner: self.inner.clone(),
        }
    }
}

impl<S: State> Flow<S> {
    pub fn new(id: impl Into<FlowId>, state: S) -> Self {
        Self::build(id.into(), state, None)
    }

    pub fn with_resolver<R>(id: impl Into<FlowId>, state: S, resolver: R) -> Self
    where
        R: NavigationResolver<S>,
    {
        Self::build(id.into(), state, Some(Box::new(resolver)))
    }

    fn build(id: FlowId, state: S, resolver: Option<Box<dyn NavigationResolver<S>>>) -> Self {
        Flow {
            inner: Arc::new(FlowInner {
                node: FlowRef::allocate(),
                id,
                state: Mutex::new(state),
                resolver,
                subscribers: SubscriptionRegistry::new(),
                coordinator: RwLock::new(None),
            }),
        }
    }

    /// Node identity.
    pub fn node(&self) -> FlowRef {
        self.inner.node
    }

    pub fn id(&self) -> &FlowId {
        &self.inner.id
    }

    /// Clone of the current state.
    pub fn state(&self) -> S {
        self.inner.state.lock().clone()
    }

    /// Read the current state without cloning it.
    pub fn with_state<R>(&self, read: impl FnOnce(&S) -> R) -> R {
        read(&self.inner.state.lock())
    }

    /// Mutate the state in place and notify subscribers of the result.
    pub fn mutate(&self, change: impl FnOnce(&mut S)) {
        let mut state = self.inner.state.lock();
        change(&mut state);
        // Post under the state lock so snapshots leave in mutation order.
        // Lock order is state, then registry.
        self.inner.subscribers.notify_state(Arc::new(state.clone()));
    }

    /// Process one action.
    ///
    /// A navigation intent goes to the resolver; a resolved request is posted
    /// to every subscriber's `perform` and returned. Any other action makes
    /// the state react and posts the new state to every subscriber's `update`.
    pub fn process(&self, action: &dyn Action) -> Option<Arc<NavigationRequest>> {
        if let Some(intent) = action.as_intent() {
            let resolver = self.inner.resolver.as_ref()?;
            let Some(request) = resolver.resolve(self, intent) else {
                tracing::trace!(
                    tributary.flow = %self.inner.id,
                    tributary.action = action.name(),
                    "Intent not actionable"
                );
                return None;
            };
            let request = Arc::new(request);
            self.inner.subscribers.notify_navigation(&request);
            return Some(request);
        }

        self.mutate(|state| state.react(action));
        None
    }

    /// Subscribe on a dedicated delivery context.
    pub fn subscribe<T: Subscriber<S>>(&self, subscriber: &Arc<T>) -> SubscriptionHandle {
        let label = format!("{}/{}", self.inner.id, self.inner.node);
        self.inner
            .subscribers
            .subscribe(subscriber, || DeliveryContext::dedicated(label))
    }

    /// Subscribe on a caller-chosen delivery context.
    pub fn subscribe_on<T: Subscriber<S>>(
        &self,
        subscriber: &Arc<T>,
        context: DeliveryContext,
    ) -> SubscriptionHandle {
        self.inner.subscribers.subscribe(subscriber, || context)
    }

    /// Remove `subscriber`; a subscriber that was never registered is ignored.
    pub fn unsubscribe<T: ?Sized>(&self, subscriber: &Arc<T>) {
        self.inner.subscribers.unsubscribe(subscriber);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Dispatch `action` through the coordinator this flow is attached to.
    ///
    /// Returns `false` when the flow is detached or its coordinator stopped.
    pub fn dispatch<A: Action>(&self, action: A) -> bool {
        let coordinator = self
            .inner
            .coordinator
            .read()
            .as_ref()
            .and_then(Weak::upgrade);
        match coordinator {
            Some(coordinator) => coordinator.dispatch_boxed(Box::new(action)),
            None => {
                tracing::debug!(tributary.flow = %self.inner.id, "Flow detached; action dropped");
                false
            }
        }
    }

    /// Whether the flow is currently bound to a live coordinator.
    pub fn is_attached(&self) -> bool {
        self.inner
            .coordinator
            .read()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }
}

impl<S: State> fmt::Debug for Flow<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("node", &self.inner.node)
            .field("id", &self.inner.id)
            .field("state_type", &StateType::of::<S>())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

/// Object-safe view of a flow of any state type.
pub trait AnyFlow: Send + Sync + 'static {
    fn node(&self) -> FlowRef;
    fn id(&self) -> &FlowId;
    fn state_type(&self) -> StateType;
    fn process(&self, action: &dyn Action) -> Option<Arc<NavigationRequest>>;
    fn bind(&self, dispatcher: Weak<dyn Dispatcher>);
    fn unbind(&self);
    fn as_any(&self) -> &dyn Any;
}

impl<S: State> AnyFlow for Flow<S> {
    fn node(&self) -> FlowRef {
        self.inner.node
    }

    fn id(&self) -> &FlowId {
        &self.inner.id
    }

    fn state_type(&self) -> StateType {
        StateType::of::<S>()
    }

    fn process(&self, action: &dyn Action) -> Option<Arc<NavigationRequest>> {
        Flow::process(self, action)
    }

    fn bind(&self, dispatcher: Weak<dyn Dispatcher>) {
        *self.inner.coordinator.write() = Some(dispatcher);
    }

    fn unbind(&self) {
        *self.inner.coordinator.write() = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased flow as stored in the tree.
#[derive(Clone)]
pub struct FlowHandle(Arc<dyn AnyFlow>);

impl FlowHandle {
    pub fn node(&self) -> FlowRef {
        self.0.node()
    }

    pub fn id(&self) -> &FlowId {
        self.0.id()
    }

    pub fn state_type(&self) -> StateType {
        self.0.state_type()
    }

    pub fn process(&self, action: &dyn Action) -> Option<Arc<NavigationRequest>> {
        self.0.process(action)
    }

    pub fn bind(&self, dispatcher: Weak<dyn Dispatcher>) {
        self.0.bind(dispatcher);
    }

    pub fn unbind(&self) {
        self.0.unbind();
    }

    /// Recover the typed flow when its state type is exactly `S`.
    pub fn downcast<S: State>(&self) -> Option<Flow<S>> {
        self.0.as_any().downcast_ref::<Flow<S>>().cloned()
    }
}

impl fmt::Debug for FlowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowHandle")
            .field("node", &self.node())
            .field("id", self.id())
            .field("state_type", &self.state_type())
            .finish()
    }
}

impl<S: State> From<Flow<S>> for FlowHandle {
    fn from(flow: Flow<S>) -> Self {
        FlowHandle(Arc::new(flow))
    }
}

impl<S: State> From<&Flow<S>> for FlowHandle {
    fn from(flow: &Flow<S>) -> Self {
        FlowHandle(Arc::new(flow.clone()))
    }
}

impl From<&FlowHandle> for FlowHandle {
    fn from(handle: &FlowHandle) -> Self {
        handle.clone()
    }
}

impl<S: State> From<&Flow<S>> for FlowRef {
    fn from(flow: &Flow<S>) -> Self {
        flow.node()
    }
}

impl From<&FlowHandle> for FlowRef {
    fn from(handle: &FlowHandle) -> Self {
        handle.node()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::NavigationPerformer;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tributary_flow::NavigationIntent;

    #[derive(Debug)]
    struct Increment;

    #[derive(Debug)]
    struct OpenDetail {
        id: u32,
    }

    tributary_flow::action!(Increment);
    tributary_flow::navigation_intent!(OpenDetail);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        count: u32,
    }

    impl State for Counter {
        fn react(&mut self, action: &dyn Action) {
            if action.is::<Increment>() {
                self.count += 1;
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Detail {
        id: u32,
    }

    impl State for Detail {
        fn react(&mut self, _action: &dyn Action) {}
    }

    enum Seen {
        State(Counter),
        Navigation(FlowRef),
    }

    struct Observer {
        tx: mpsc::UnboundedSender<Seen>,
    }

    impl NavigationPerformer for Observer {
        fn perform(&self, request: &NavigationRequest) {
            let _ = self.tx.send(Seen::Navigation(request.to.node()));
        }
    }

    impl Subscriber<Counter> for Observer {
        fn update(&self, state: &Counter) {
            let _ = self.tx.send(Seen::State(state.clone()));
        }
    }

    fn resolver(flow: &Flow<Counter>, intent: &dyn NavigationIntent) -> Option<NavigationRequest> {
        let open = intent.downcast_ref::<OpenDetail>()?;
        let detail = Flow::new("detail", Detail { id: open.id });
        Some(NavigationRequest::new(flow, &detail).create(flow, detail))
    }

    #[tokio::test]
    async fn test_action_reacts_and_notifies() {
        let flow = Flow::new("counter", Counter::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = Arc::new(Observer { tx });
        flow.subscribe(&observer);

        assert!(flow.process(&Increment).is_none());
        assert_eq!(flow.state(), Counter { count: 1 });

        match timeout(Duration::from_secs(1), rx.recv()).await.unwrap() {
            Some(Seen::State(state)) => assert_eq!(state.count, 1),
            _ => panic!("expected a state update"),
        }
    }

    #[tokio::test]
    async fn test_intent_resolves_and_performs() {
        let flow = Flow::with_resolver("counter", Counter::default(), resolver);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = Arc::new(Observer { tx });
        flow.subscribe(&observer);

        let request = flow.process(&OpenDetail { id: 5 }).expect("resolved");
        assert_eq!(request.from.node(), flow.node());
        let detail = request.to.downcast::<Detail>().expect("detail flow");
        assert_eq!(detail.state().id, 5);
        assert_eq!(flow.state(), Counter::default(), "intents never touch state");

        match timeout(Duration::from_secs(1), rx.recv()).await.unwrap() {
            Some(Seen::Navigation(to)) => assert_eq!(to, detail.node()),
            _ => panic!("expected a navigation"),
        }
    }

    #[test]
    fn test_intent_without_resolver_is_dropped() {
        let flow = Flow::new("counter", Counter::default());
        assert!(flow.process(&OpenDetail { id: 1 }).is_none());
        assert_eq!(flow.state(), Counter::default());
    }

    #[test]
    fn test_handle_downcast_matches_exact_state_type() {
        let flow = Flow::new("counter", Counter::default());
        let handle = FlowHandle::from(&flow);
        assert_eq!(handle.node(), flow.node());
        assert_eq!(handle.state_type(), StateType::of::<Counter>());
        assert!(handle.downcast::<Counter>().is_some());
        assert!(handle.downcast::<Detail>().is_none());
    }

    #[test]
    fn test_concurrent_mutations_arrive_in_order() {
        struct Tally {
            tx: std::sync::mpsc::Sender<u32>,
        }

        impl NavigationPerformer for Tally {}

        impl Subscriber<Counter> for Tally {
            fn update(&self, state: &Counter) {
                let _ = self.tx.send(state.count);
            }
        }

        const THREADS: u32 = 4;
        const PER_THREAD: u32 = 2_000;

        let flow = Flow::new("counter", Counter::default());
        let (tx, rx) = std::sync::mpsc::channel();
        let tally = Arc::new(Tally { tx });
        flow.subscribe(&tally);

        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let flow = flow.clone();
                std::thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        flow.mutate(|counter| counter.count += 1);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let total = THREADS * PER_THREAD;
        let mut last = 0;
        for _ in 0..total {
            let count = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(count > last, "update went backwards: {count} after {last}");
            last = count;
        }
        assert_eq!(last, total);
    }

    #[test]
    fn test_detached_flow_cannot_dispatch() {
        let flow = Flow::new("counter", Counter::default());
        assert!(!flow.is_attached());
        assert!(!flow.dispatch(Increment));
    }
}
