//! State - The Value Owned by a Flow
//!
//! Every flow in the tree owns exactly one state value. The state reacts to
//! actions by mutating itself in place.
//!
//! # Example
//! ```rust
//! use tributary_flow::{Action, State};
//!
//! #[derive(Debug)]
//! struct Increment;
//! tributary_flow::action!(Increment);
//!
//! #[derive(Debug, Clone, Default)]
//! struct Counter {
//!     count: u32,
//! }
//!
//! impl State for Counter {
//!     fn react(&mut self, action: &dyn Action) {
//!         if action.is::<Increment>() {
//!             self.count += 1;
//!         }
//!     }
//! }
//! ```

use crate::action::Action;

/// A mutable value that updates itself from actions.
///
/// `Clone` is required because subscribers receive snapshots while the flow
/// keeps reacting to later actions.
pub trait State: Clone + Send + Sync + 'static {
    /// Apply `action` to this state. Actions the state does not care about
    /// are ignored.
    fn react(&mut self, action: &dyn Action);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Add(u32);

    #[derive(Debug)]
    struct Unrelated;

    crate::action!(Add, Unrelated);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Total(u32);

    impl State for Total {
        fn react(&mut self, action: &dyn Action) {
            if let Some(Add(n)) = action.downcast_ref::<Add>() {
                self.0 += n;
            }
        }
    }

    #[test]
    fn test_react_ignores_unrelated_actions() {
        let mut total = Total::default();
        total.react(&Add(3));
        total.react(&Unrelated);
        total.react(&Add(4));
        assert_eq!(total, Total(7));
    }
}
