//! Flow definition files
//!
//! A flow file is a YAML export of the four definition tables. Transitions
//! keep file order, which is the priority order the engine evaluates them in.
//!
//! ```yaml
//! initial_state: start
//! states:
//!   - { id: 1, name: start }
//!   - { id: 2, name: informar_deuda }
//! conditions:
//!   - { id: 1, expression: tiene_documento_valido }
//! actions:
//!   - { id: 1, name: consultar_cliente, type: run_query, payload: { query: cliente_por_documento } }
//! transitions:
//!   - { id: 1, state_id: 1, condition_id: 1, action_id: 1, next_state_id: 2 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use collections_flow_core::{
    FlowAction, FlowCondition, FlowState, FlowTransition, DEFAULT_INITIAL_STATE,
};

use crate::ConfigError;

fn default_initial_state() -> String {
    DEFAULT_INITIAL_STATE.to_string()
}

/// Parsed flow definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDefinitionFile {
    #[serde(default = "default_initial_state")]
    pub initial_state: String,
    #[serde(default)]
    pub states: Vec<FlowState>,
    #[serde(default)]
    pub conditions: Vec<FlowCondition>,
    #[serde(default)]
    pub actions: Vec<FlowAction>,
    #[serde(default)]
    pub transitions: Vec<FlowTransition>,
}

impl Default for FlowDefinitionFile {
    fn default() -> Self {
        Self {
            initial_state: default_initial_state(),
            states: Vec::new(),
            conditions: Vec::new(),
            actions: Vec::new(),
            transitions: Vec::new(),
        }
    }
}

impl FlowDefinitionFile {
    /// Load and validate a flow file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(format!("Failed to read flow file: {}", e)))?;

        let flows = Self::from_yaml(&content)?;

        tracing::info!(
            path = %path.display(),
            states = flows.states.len(),
            transitions = flows.transitions.len(),
            "Loaded flow definitions"
        );

        Ok(flows)
    }

    /// Parse and validate YAML content
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let flows: Self = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse flow file: {}", e)))?;
        flows.validate()?;
        for (state, count) in flows.shadowed_defaults() {
            tracing::warn!(
                state = %state,
                count,
                "State has several unconditional transitions; only the first can be taken"
            );
        }
        Ok(flows)
    }

    /// Check ids are unique and every reference resolves; logs nothing
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut state_ids = HashSet::new();
        let mut state_names = HashSet::new();
        for state in &self.states {
            if !state_ids.insert(state.id) {
                return Err(invalid("states", format!("duplicate state id {}", state.id)));
            }
            if !state_names.insert(state.name.as_str()) {
                return Err(invalid("states", format!("duplicate state name {}", state.name)));
            }
        }

        if !state_names.contains(self.initial_state.as_str()) {
            return Err(invalid(
                "initial_state",
                format!("state {} is not defined", self.initial_state),
            ));
        }

        let condition_ids = unique_ids("conditions", self.conditions.iter().map(|c| c.id))?;
        let action_ids = unique_ids("actions", self.actions.iter().map(|a| a.id))?;

        let mut action_names = HashSet::new();
        for action in &self.actions {
            if !action_names.insert(action.name.as_str()) {
                return Err(invalid("actions", format!("duplicate action name {}", action.name)));
            }
        }

        unique_ids("transitions", self.transitions.iter().map(|t| t.id))?;

        for t in &self.transitions {
            if !state_ids.contains(&t.state_id) {
                return Err(invalid(
                    "transitions",
                    format!("transition {} starts at unknown state id {}", t.id, t.state_id),
                ));
            }
            if !state_ids.contains(&t.next_state_id) {
                return Err(invalid(
                    "transitions",
                    format!(
                        "transition {} targets unknown state id {}",
                        t.id, t.next_state_id
                    ),
                ));
            }
            if let Some(cid) = t.condition_id {
                if !condition_ids.contains(&cid) {
                    return Err(invalid(
                        "transitions",
                        format!("transition {} references unknown condition id {}", t.id, cid),
                    ));
                }
            }
            if let Some(aid) = t.action_id {
                if !action_ids.contains(&aid) {
                    return Err(invalid(
                        "transitions",
                        format!("transition {} references unknown action id {}", t.id, aid),
                    ));
                }
            }
        }

        Ok(())
    }

    /// States with more than one unconditional transition
    ///
    /// Only the first of them can ever be taken.
    pub fn shadowed_defaults(&self) -> Vec<(String, usize)> {
        let mut shadowed: Vec<(String, usize)> = self
            .default_transition_counts()
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .collect();
        shadowed.sort();
        shadowed
    }

    /// Number of unconditional transitions per state name
    pub fn default_transition_counts(&self) -> HashMap<String, usize> {
        let names: HashMap<u32, &str> =
            self.states.iter().map(|s| (s.id, s.name.as_str())).collect();

        let mut counts = HashMap::new();
        for t in self.transitions.iter().filter(|t| t.condition_id.is_none()) {
            if let Some(name) = names.get(&t.state_id) {
                *counts.entry(name.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Distinct condition expressions, for checking against the evaluator
    pub fn condition_expressions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.conditions
            .iter()
            .map(|c| c.expression.as_str())
            .filter(|e| seen.insert(*e))
            .collect()
    }
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

fn unique_ids(
    field: &str,
    ids: impl Iterator<Item = u32>,
) -> Result<HashSet<u32>, ConfigError> {
    let mut set = HashSet::new();
    for id in ids {
        if !set.insert(id) {
            return Err(invalid(field, format!("duplicate id {}", id)));
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOW: &str = r#"
initial_state: A
states:
  - { id: 1, name: A }
  - { id: 2, name: B }
  - { id: 3, name: C }
conditions:
  - { id: 1, expression: saldo_mayor_1000 }
actions:
  - id: 1
    name: notify_highvalue
    type: send_template
    payload:
      template: "Saldo alto: {saldo}"
transitions:
  - { id: 1, state_id: 1, condition_id: 1, action_id: 1, next_state_id: 2 }
  - { id: 2, state_id: 1, next_state_id: 3 }
"#;

    #[test]
    fn test_parse_valid_flow() {
        let flows = FlowDefinitionFile::from_yaml(FLOW).unwrap();
        assert_eq!(flows.initial_state, "A");
        assert_eq!(flows.states.len(), 3);
        assert_eq!(flows.actions[0].action_type, "send_template");
        assert_eq!(flows.transitions[1].condition_id, None);
        assert_eq!(flows.condition_expressions(), vec!["saldo_mayor_1000"]);
        assert_eq!(flows.default_transition_counts().get("A"), Some(&1));
        assert!(flows.shadowed_defaults().is_empty());
    }

    #[test]
    fn test_shadowed_defaults() {
        let mut flows = FlowDefinitionFile::from_yaml(FLOW).unwrap();
        flows.transitions.push(FlowTransition {
            id: 3,
            state_id: 1,
            condition_id: None,
            action_id: None,
            next_state_id: 2,
        });
        assert!(flows.validate().is_ok());
        assert_eq!(flows.shadowed_defaults(), vec![("A".to_string(), 2)]);
    }

    #[test]
    fn test_rejects_dangling_next_state() {
        let yaml = FLOW.replace("next_state_id: 3", "next_state_id: 9");
        let err = FlowDefinitionFile::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("unknown state id 9"));
    }

    #[test]
    fn test_rejects_unknown_condition_and_action() {
        let yaml = FLOW.replace("condition_id: 1,", "condition_id: 7,");
        assert!(FlowDefinitionFile::from_yaml(&yaml).is_err());

        let yaml = FLOW.replace("action_id: 1,", "action_id: 7,");
        assert!(FlowDefinitionFile::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_rejects_duplicate_state_names() {
        let yaml = FLOW.replace("{ id: 3, name: C }", "{ id: 3, name: B }");
        let err = FlowDefinitionFile::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate state name B"));
    }

    #[test]
    fn test_rejects_missing_initial_state() {
        let yaml = FLOW.replace("initial_state: A", "initial_state: start");
        assert!(FlowDefinitionFile::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = FlowDefinitionFile::load("/nonexistent/flows.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.yaml");
        std::fs::write(&path, FLOW).unwrap();

        let flows = FlowDefinitionFile::load(&path).unwrap();
        assert_eq!(flows.transitions.len(), 2);
    }
}
