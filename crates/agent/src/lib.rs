//! Collections flow agent
//!
//! Features:
//! - Condition evaluation with built-in and registered predicates
//! - Flow engine resolving one transition per inbound message
//! - In-memory definition store built from flow files
//! - Conversation state pointer with transition history
//! - Monitored dispatch reporting each decision to the system monitor

pub mod conditions;
pub mod conversation;
pub mod dispatch;
pub mod engine;
pub mod store;

pub use conditions::{BuiltinCondition, ConditionEvaluator, Predicate};
pub use conversation::{Conversation, TransitionRecord};
pub use dispatch::{FlowDispatcher, TierDecision, INTENTION_KEY};
pub use engine::{ActionOutcome, FlowEngine, SelectedTransition, StepOutcome, TransitionInfo};
pub use store::{InMemoryFlowStore, InMemoryFlowStoreBuilder};
