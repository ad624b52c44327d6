//! In-memory flow definition store
//!
//! Definitions are resolved once at construction; lookups afterwards are
//! read-only, so one store can be shared by every conversation.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use collections_flow_config::{ConfigError, FlowDefinitionFile};
use collections_flow_core::{FlowDefinitionStore, ResolvedTransition, StoreError};

#[derive(Debug, Clone)]
pub struct InMemoryFlowStore {
    initial_state: String,
    states: HashSet<String>,
    transitions: HashMap<String, Vec<ResolvedTransition>>,
}

impl InMemoryFlowStore {
    /// Start an empty store whose entry point is `initial_state`
    pub fn builder(initial_state: impl Into<String>) -> InMemoryFlowStoreBuilder {
        let initial_state = initial_state.into();
        let mut states = HashSet::new();
        states.insert(initial_state.clone());
        InMemoryFlowStoreBuilder {
            store: Self {
                initial_state,
                states,
                transitions: HashMap::new(),
            },
        }
    }

    /// Resolve a definition file into name-keyed transitions
    ///
    /// Expects a file that went through [`FlowDefinitionFile::load`] or
    /// [`FlowDefinitionFile::from_yaml`]; references that do not resolve are
    /// still reported as errors.
    pub fn from_definitions(defs: &FlowDefinitionFile) -> Result<Self, ConfigError> {
        if !defs.states.iter().any(|s| s.name == defs.initial_state) {
            return Err(ConfigError::InvalidValue {
                field: "initial_state".to_string(),
                message: format!("state {} is not defined", defs.initial_state),
            });
        }

        let state_names: HashMap<u32, &str> =
            defs.states.iter().map(|s| (s.id, s.name.as_str())).collect();
        let conditions: HashMap<u32, _> = defs.conditions.iter().map(|c| (c.id, c)).collect();
        let actions: HashMap<u32, _> = defs.actions.iter().map(|a| (a.id, a)).collect();

        let lookup_state = |id: u32| {
            state_names
                .get(&id)
                .copied()
                .ok_or_else(|| ConfigError::MissingField(format!("state id {}", id)))
        };

        let mut transitions: HashMap<String, Vec<ResolvedTransition>> = HashMap::new();
        for t in &defs.transitions {
            let from = lookup_state(t.state_id)?;
            let to = lookup_state(t.next_state_id)?;

            let condition = match t.condition_id {
                Some(id) => Some(
                    conditions
                        .get(&id)
                        .map(|c| (*c).clone())
                        .ok_or_else(|| ConfigError::MissingField(format!("condition id {}", id)))?,
                ),
                None => None,
            };
            let action = match t.action_id {
                Some(id) => Some(
                    actions
                        .get(&id)
                        .map(|a| (*a).clone())
                        .ok_or_else(|| ConfigError::MissingField(format!("action id {}", id)))?,
                ),
                None => None,
            };

            transitions
                .entry(from.to_string())
                .or_default()
                .push(ResolvedTransition {
                    condition,
                    action,
                    next_state: to.to_string(),
                });
        }

        Ok(Self {
            initial_state: defs.initial_state.clone(),
            states: defs.states.iter().map(|s| s.name.clone()).collect(),
            transitions,
        })
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(Vec::len).sum()
    }

    /// Condition expressions used anywhere in the flow
    pub fn condition_expressions(&self) -> Vec<&str> {
        let mut exprs: Vec<&str> = self
            .transitions
            .values()
            .flatten()
            .filter_map(|t| t.condition.as_ref().map(|c| c.expression.as_str()))
            .collect();
        exprs.sort_unstable();
        exprs.dedup();
        exprs
    }

    /// Action types used anywhere in the flow
    pub fn action_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .transitions
            .values()
            .flatten()
            .filter_map(|t| t.action.as_ref().map(|a| a.action_type.as_str()))
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

#[async_trait]
impl FlowDefinitionStore for InMemoryFlowStore {
    async fn list_transitions(&self, state: &str) -> Result<Vec<ResolvedTransition>, StoreError> {
        Ok(self.transitions.get(state).cloned().unwrap_or_default())
    }

    async fn state_exists(&self, state: &str) -> Result<bool, StoreError> {
        Ok(self.states.contains(state))
    }

    fn initial_state(&self) -> &str {
        &self.initial_state
    }
}

/// Programmatic construction, mainly for tests and embedded flows
///
/// Targets are not checked here, so a flow with dangling transitions can be
/// built on purpose.
pub struct InMemoryFlowStoreBuilder {
    store: InMemoryFlowStore,
}

impl InMemoryFlowStoreBuilder {
    pub fn state(mut self, name: impl Into<String>) -> Self {
        self.store.states.insert(name.into());
        self
    }

    /// Append a transition; order of calls is priority order
    pub fn transition(mut self, from: impl Into<String>, transition: ResolvedTransition) -> Self {
        let from = from.into();
        self.store.states.insert(from.clone());
        self.store
            .transitions
            .entry(from)
            .or_default()
            .push(transition);
        self
    }

    pub fn build(self) -> InMemoryFlowStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collections_flow_core::{FlowCondition, FlowState, FlowTransition};

    fn defs() -> FlowDefinitionFile {
        FlowDefinitionFile {
            initial_state: "A".into(),
            states: vec![FlowState::new(1, "A"), FlowState::new(2, "B"), FlowState::new(3, "C")],
            conditions: vec![FlowCondition::new(1, "saldo_mayor_1000")],
            actions: vec![],
            transitions: vec![
                FlowTransition {
                    id: 1,
                    state_id: 1,
                    condition_id: Some(1),
                    action_id: None,
                    next_state_id: 2,
                },
                FlowTransition {
                    id: 2,
                    state_id: 1,
                    condition_id: None,
                    action_id: None,
                    next_state_id: 3,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_resolves_in_file_order() {
        let store = InMemoryFlowStore::from_definitions(&defs()).unwrap();
        assert_eq!(store.initial_state(), "A");

        let ts = store.list_transitions("A").await.unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(ts[0].next_state, "B");
        assert_eq!(
            ts[0].condition.as_ref().map(|c| c.expression.as_str()),
            Some("saldo_mayor_1000")
        );
        assert_eq!(ts[1].next_state, "C");
        assert!(ts[1].is_unconditional());
    }

    #[tokio::test]
    async fn test_unknown_state_lists_nothing() {
        let store = InMemoryFlowStore::from_definitions(&defs()).unwrap();
        assert!(store.list_transitions("Z").await.unwrap().is_empty());
        assert!(!store.state_exists("Z").await.unwrap());
        assert!(store.state_exists("C").await.unwrap());
    }

    #[test]
    fn test_rejects_invalid_definitions() {
        let mut bad = defs();
        bad.transitions[1].next_state_id = 9;
        assert!(matches!(
            InMemoryFlowStore::from_definitions(&bad),
            Err(ConfigError::MissingField(ref f)) if f == "state id 9"
        ));

        let mut bad = defs();
        bad.conditions.clear();
        assert!(InMemoryFlowStore::from_definitions(&bad).is_err());

        let mut bad = defs();
        bad.initial_state = "Z".into();
        assert!(matches!(
            InMemoryFlowStore::from_definitions(&bad),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_introspection() {
        let store = InMemoryFlowStore::from_definitions(&defs()).unwrap();
        assert_eq!(store.state_count(), 3);
        assert_eq!(store.transition_count(), 2);
        assert_eq!(store.condition_expressions(), vec!["saldo_mayor_1000"]);
        assert!(store.action_types().is_empty());
    }
}
