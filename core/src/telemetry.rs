//! # Telemetry: Observability Hooks
//!
//! Tracing setup for binaries plus a middleware that logs every dispatched
//! action.

use crate::middleware::Middleware;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tributary_flow::Action;

/// Initialize a simple stdout tracing subscriber for development.
///
/// Honors `RUST_LOG`; safe to call more than once.
pub fn init_stdout_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tributary_runtime=debug"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Middleware logging each action before and after it crosses the tree.
#[derive(Debug)]
pub struct TracingMiddleware {
    level: Level,
    sequence: AtomicU64,
}

impl TracingMiddleware {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            sequence: AtomicU64::new(0),
        }
    }

    /// Number of actions seen so far.
    pub fn dispatched(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::error!($($arg)+)
        } else if level == Level::WARN {
            tracing::warn!($($arg)+)
        } else if level == Level::INFO {
            tracing::info!($($arg)+)
        } else if level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    }};
}

impl Middleware for TracingMiddleware {
    fn will_process(&self, action: &dyn Action) {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        log_at!(self.level, tributary.action = action.name(), seq, ?action, "Dispatching action");
    }

    fn did_process(&self, action: &dyn Action) {
        log_at!(self.level, tributary.action = action.name(), "Action processed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ping;

    tributary_flow::action!(Ping);

    #[test]
    fn test_counts_dispatched_actions() {
        let middleware = TracingMiddleware::default();
        middleware.will_process(&Ping);
        middleware.did_process(&Ping);
        middleware.will_process(&Ping);
        assert_eq!(middleware.dispatched(), 2);
    }
}
