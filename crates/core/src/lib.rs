//! Core traits and types for the collections flow agent
//!
//! This crate provides foundational types used across all other crates:
//! - Flow definition model (states, conditions, actions, transitions)
//! - Conversation context
//! - Decision tiers of the classification pipeline
//! - Error types
//! - Traits for the definition store and the action executor

pub mod context;
pub mod error;
pub mod flow;
pub mod tier;
pub mod traits;

pub use context::{ContextDelta, FlowContext, LEGACY_MESSAGE_KEY, MESSAGE_KEY};
pub use error::{ActionError, ConditionError, FlowError, Result, StoreError};
pub use flow::{
    FlowAction, FlowCondition, FlowState, FlowTransition, ResolvedTransition,
    DEFAULT_INITIAL_STATE,
};
pub use tier::{CacheEvent, DecisionTier};
pub use traits::{ActionExecutor, FlowDefinitionStore};
