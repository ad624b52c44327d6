//! Flow definition types
//!
//! States, conditions, actions and transitions are data, not code. They are
//! authored outside the engine and are read-only while conversations run.

use serde::{Deserialize, Serialize};

/// Conventional name of the entry state for new conversations
pub const DEFAULT_INITIAL_STATE: &str = "start";

/// A named point in a conversation's progression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub id: u32,
    pub name: String,
}

impl FlowState {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Guard attached to a transition
///
/// `expression` is a registered predicate name (`saldo_mayor_1000`) or a
/// small boolean expression over predicate names
/// (`tiene_documento_valido and not primera_conversacion`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCondition {
    pub id: u32,
    pub expression: String,
}

impl FlowCondition {
    pub fn new(id: u32, expression: impl Into<String>) -> Self {
        Self {
            id,
            expression: expression.into(),
        }
    }
}

/// Side effect attached to a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowAction {
    pub id: u32,
    pub name: String,
    /// Discriminator naming the effect, e.g. `run_query`, `send_template`
    #[serde(rename = "type")]
    pub action_type: String,
    /// Opaque configuration handed to the executor
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl FlowAction {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        action_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            action_type: action_type.into(),
            payload,
        }
    }
}

/// Directed edge between two states, as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTransition {
    pub id: u32,
    pub state_id: u32,
    /// `None` marks an unconditional (default) transition
    #[serde(default)]
    pub condition_id: Option<u32>,
    /// `None` means the edge has no side effect
    #[serde(default)]
    pub action_id: Option<u32>,
    pub next_state_id: u32,
}

/// A transition with its condition and action already joined in
///
/// This is what a definition store hands to the engine, in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTransition {
    pub condition: Option<FlowCondition>,
    pub action: Option<FlowAction>,
    pub next_state: String,
}

impl ResolvedTransition {
    /// Unconditional edge without side effects
    pub fn to(next_state: impl Into<String>) -> Self {
        Self {
            condition: None,
            action: None,
            next_state: next_state.into(),
        }
    }

    pub fn when(mut self, condition: FlowCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_action(mut self, action: FlowAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn is_unconditional(&self) -> bool {
        self.condition.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_serializes_as_type() {
        let action = FlowAction::new(
            1,
            "notify_highvalue",
            "send_template",
            serde_json::json!({"template": "hola"}),
        );
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "send_template");
        assert!(json.get("action_type").is_none());
    }

    #[test]
    fn test_transition_optional_fields_default() {
        let t: FlowTransition =
            serde_json::from_str(r#"{"id": 1, "state_id": 1, "next_state_id": 2}"#).unwrap();
        assert!(t.condition_id.is_none());
        assert!(t.action_id.is_none());
    }

    #[test]
    fn test_resolved_transition_builder() {
        let t = ResolvedTransition::to("B")
            .when(FlowCondition::new(1, "saldo_mayor_1000"))
            .with_action(FlowAction::new(2, "notify", "send_template", serde_json::Value::Null));
        assert!(!t.is_unconditional());
        assert_eq!(t.next_state, "B");
        assert!(ResolvedTransition::to("C").is_unconditional());
    }
}
