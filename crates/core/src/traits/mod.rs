//! Core traits for the flow agent
//!
//! The engine talks to its collaborators only through these traits so that
//! storage and side effects can be swapped or mocked:
//!
//! ```text
//! FlowDefinitionStore: states and ordered outgoing transitions (read-mostly)
//! ActionExecutor:      performs the side effect attached to a transition
//! ```

mod action;
mod store;

pub use action::ActionExecutor;
pub use store::FlowDefinitionStore;
