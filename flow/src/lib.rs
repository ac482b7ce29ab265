//! Tributary Flow - Flow Tree Layer
//!
//! This crate defines the **structural** aspects of Tributary:
//! - `Action` / `NavigationIntent`: what gets dispatched
//! - `State`: the value a flow owns and how it reacts
//! - `Tree`: the arena hierarchy that holds flows
//!
//! **IMPORTANT**: This layer is Pure Rust - no IO, no Async.

pub mod action;
pub mod state;
pub mod tree;

pub use action::{Action, NavigationIntent, short_type_name};
pub use state::State;
pub use tree::{DepthFirst, Position, Tree};
