//! # Navigation Demo - Counter With A Detail Screen
//!
//! A home flow counts `Increment` actions and resolves `OpenDetail` by
//! attaching a detail flow beneath itself. A "screen" subscriber renders
//! state updates and performs navigation. `CloseDetail` tears the detail
//! flow down again.
//!
//! ```bash
//! cargo run --bin navigation-demo
//! TRIBUTARY_MODE=prod RUST_LOG=debug cargo run --bin navigation-demo
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tributary::core::telemetry::init_stdout_tracing;
use tributary::prelude::*;

// ============================================================================
// 1. Actions and intents
// ============================================================================

#[derive(Debug)]
struct Increment;

#[derive(Debug)]
struct OpenDetail {
    id: u32,
}

#[derive(Debug)]
struct CloseDetail;

action!(Increment);
navigation_intent!(OpenDetail, CloseDetail);

// ============================================================================
// 2. States
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Home {
    count: u32,
}

impl State for Home {
    fn react(&mut self, action: &dyn Action) {
        if action.is::<Increment>() {
            self.count += 1;
        }
    }
}

#[derive(Debug, Clone)]
struct Detail {
    id: u32,
    views: u32,
}

impl State for Detail {
    fn react(&mut self, _action: &dyn Action) {}
}

fn resolve_home(home: &Flow<Home>, intent: &dyn NavigationIntent) -> Option<NavigationRequest> {
    if let Some(open) = intent.downcast_ref::<OpenDetail>() {
        let detail = Flow::new(format!("detail-{}", open.id), Detail { id: open.id, views: 0 });
        return Some(
            NavigationRequest::new(home, &detail)
                .create(home, detail)
                .with_info("animated", true),
        );
    }
    None
}

// ============================================================================
// 3. Screen: subscriber + navigation performer
// ============================================================================

struct HomeScreen {
    events: mpsc::UnboundedSender<String>,
}

impl NavigationPerformer for HomeScreen {
    fn perform(&self, request: &NavigationRequest) {
        let _ = self.events.send(format!(
            "navigate {} -> {} ({} new flow(s))",
            request.from.id(),
            request.to.id(),
            request.creations.len()
        ));
    }
}

impl Subscriber<Home> for HomeScreen {
    fn update(&self, state: &Home) {
        let _ = self.events.send(format!("render home: count = {}", state.count));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_stdout_tracing();

    let config = CoordinatorConfig::from_env()?;
    tracing::info!(label = %config.label, "Starting navigation demo");

    let (events, mut rx) = mpsc::unbounded_channel();
    let screen = Arc::new(HomeScreen { events });
    let ui = DeliveryContext::dedicated("ui");

    // Open detail flow, remembered so `CloseDetail` knows what to delete.
    let opened: Arc<Mutex<Option<Flow<Detail>>>> = Arc::default();
    let home = {
        let opened = opened.clone();
        Flow::with_resolver(
            "home",
            Home::default(),
            move |flow: &Flow<Home>, intent: &dyn NavigationIntent| {
                if intent.downcast_ref::<CloseDetail>().is_some() {
                    let detail = opened.lock().take()?;
                    return Some(NavigationRequest::new(&detail, flow).delete(&detail));
                }
                let request = resolve_home(flow, intent)?;
                *opened.lock() = request.to.downcast::<Detail>();
                Some(request)
            },
        )
    };
    home.subscribe_on(&screen, ui.clone());

    let coordinator = Coordinator::builder(&home)
        .middleware(TracingMiddleware::default())
        .config(config)
        .spawn();

    coordinator.dispatch(Increment);
    coordinator.dispatch(Increment);
    coordinator.dispatch(OpenDetail { id: 5 });
    coordinator.dispatch_command(command_fn::<Detail, _>(|flow, _| {
        flow.mutate(|detail| detail.views += 1);
        let detail = flow.state();
        tracing::info!(detail = detail.id, views = detail.views, "Detail viewed");
    }));

    let topology = coordinator
        .topology()
        .await
        .ok_or_else(|| anyhow::anyhow!("coordinator stopped"))?;
    println!("{}", render_tree(&topology));

    coordinator.dispatch(CloseDetail);
    home.dispatch(Increment);

    let topology = coordinator
        .topology()
        .await
        .ok_or_else(|| anyhow::anyhow!("coordinator stopped"))?;
    println!("{}", render_tree(&topology));

    // Everything the screen was sent is queued ahead of this marker.
    let (done, finished) = oneshot::channel();
    ui.post(move || {
        let _ = done.send(());
    });
    finished.await?;

    while let Ok(event) = rx.try_recv() {
        println!("{event}");
    }
    Ok(())
}

fn render_tree(topology: &Topology) -> String {
    topology
        .nodes
        .iter()
        .map(|node| format!("{}{} [{}]", "  ".repeat(node.depth), node.id, node.state_type))
        .collect::<Vec<_>>()
        .join("\n")
}
