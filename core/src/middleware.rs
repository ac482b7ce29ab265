use tributary_flow::Action;

/// Observation hook around each root-level action dispatch.
///
/// Hooks run synchronously on the coordinator's dispatch context, in
/// registration order. They observe only: they cannot veto, rewrite or
/// short-circuit the action. Commands never pass through middleware.
pub trait Middleware: Send + Sync + 'static {
    /// Called before any flow sees `action`.
    fn will_process(&self, action: &dyn Action) {
        let _ = action;
    }

    /// Called after every flow has processed `action`.
    fn did_process(&self, action: &dyn Action) {
        let _ = action;
    }
}
