//! Action - Events Driving the Flow Tree
//!
//! An `Action` is any value dispatched into the tree. A `NavigationIntent`
//! is an action that asks for a navigation decision instead of a state
//! reaction.
//!
//! # Philosophy
//! > Actions describe what happened; flows decide what it means.

use std::any::{Any, type_name};
use std::fmt::Debug;

/// Marker capability for dispatchable events.
///
/// The only behavior an action carries is whether it is a navigation intent.
/// Use [`action!`](crate::action) and
/// [`navigation_intent!`](crate::navigation_intent) instead of writing the
/// impls by hand.
pub trait Action: Any + Send + Sync + Debug {
    /// Returns `Some` when this action requests a navigation decision.
    fn as_intent(&self) -> Option<&dyn NavigationIntent> {
        None
    }

    /// Readable name used in logs.
    fn name(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// An action that is resolved into a navigation request rather than applied
/// to state.
pub trait NavigationIntent: Action {}

impl dyn Action {
    /// Recover the concrete action type.
    pub fn downcast_ref<A: Action>(&self) -> Option<&A> {
        (self as &dyn Any).downcast_ref::<A>()
    }

    /// Check whether the action is of type `A`.
    pub fn is<A: Action>(&self) -> bool {
        (self as &dyn Any).is::<A>()
    }
}

impl dyn NavigationIntent {
    /// Recover the concrete intent type.
    pub fn downcast_ref<I: NavigationIntent>(&self) -> Option<&I> {
        (self as &dyn Any).downcast_ref::<I>()
    }
}

/// Strip the module path from a type name ("app::Increment" -> "Increment").
pub fn short_type_name(full: &'static str) -> &'static str {
    // Tuples, arrays, slices and references keep their full name.
    if full.starts_with(['(', '[', '&']) {
        return full;
    }
    // Generic arguments may contain "::" too; only look at the outer path.
    let outer = full.split('<').next().unwrap_or(full);
    match outer.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Declare one or more types as plain actions.
///
/// ```rust
/// #[derive(Debug)]
/// struct Increment;
/// tributary_flow::action!(Increment);
/// ```
#[macro_export]
macro_rules! action {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::Action for $ty {})+
    };
}

/// Declare one or more types as navigation intents.
///
/// ```rust
/// #[derive(Debug)]
/// struct OpenDetail { id: u32 }
/// tributary_flow::navigation_intent!(OpenDetail);
/// ```
#[macro_export]
macro_rules! navigation_intent {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Action for $ty {
                fn as_intent(&self) -> ::core::option::Option<&dyn $crate::NavigationIntent> {
                    ::core::option::Option::Some(self)
                }
            }
            impl $crate::NavigationIntent for $ty {}
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Increment;

    #[derive(Debug, PartialEq)]
    struct OpenDetail {
        id: u32,
    }

    crate::action!(Increment);
    crate::navigation_intent!(OpenDetail);

    #[test]
    fn test_plain_action_is_not_intent() {
        let action: &dyn Action = &Increment;
        assert!(action.as_intent().is_none());
        assert!(action.is::<Increment>());
        assert_eq!(action.name(), "Increment");
    }

    #[test]
    fn test_intent_downcast() {
        let action: &dyn Action = &OpenDetail { id: 5 };
        let intent = action.as_intent().expect("declared as intent");
        assert_eq!(intent.downcast_ref::<OpenDetail>(), Some(&OpenDetail { id: 5 }));
        assert!(action.downcast_ref::<Increment>().is_none());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::Increment"), "Increment");
        assert_eq!(short_type_name("Plain"), "Plain");
        assert_eq!(short_type_name("a::Wrap<b::Inner>"), "Wrap<b::Inner>");
        assert_eq!(short_type_name("(a::B, c::D)"), "(a::B, c::D)");
        assert_eq!(short_type_name("[a::B; 2]"), "[a::B; 2]");
        assert_eq!(short_type_name("&a::B"), "&a::B");
    }
}
