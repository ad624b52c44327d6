//! Flow engine
//!
//! Given a conversation's current state and context, picks the first
//! outgoing transition whose condition holds, runs its action and reports
//! the state to move to. The engine holds no mutable state; the caller owns
//! the state pointer and applies the outcome.

use serde::Serialize;
use std::sync::Arc;

use collections_flow_core::{
    ActionExecutor, ContextDelta, FlowContext, FlowDefinitionStore, FlowError,
    ResolvedTransition,
};

use crate::conditions::ConditionEvaluator;

/// Result of the action attached to a taken transition
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub name: String,
    pub action_type: String,
    /// Fields to merge into the context
    pub delta: ContextDelta,
}

/// A resolved step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub from: String,
    pub to: String,
    /// Position of the taken transition among the state's outgoing ones
    pub transition_index: usize,
    pub action: Option<ActionOutcome>,
}

impl StepOutcome {
    pub fn changed_state(&self) -> bool {
        self.from != self.to
    }
}

/// Transition chosen by [`FlowEngine::select`]
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTransition {
    pub index: usize,
    pub transition: ResolvedTransition,
}

/// Candidate transition, for introspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionInfo {
    pub condition: Option<String>,
    pub action: Option<String>,
    pub action_type: Option<String>,
    pub next_state: String,
    /// Whether the evaluator can resolve the condition
    pub condition_known: bool,
}

pub struct FlowEngine {
    store: Arc<dyn FlowDefinitionStore>,
    actions: Arc<dyn ActionExecutor>,
    conditions: Arc<ConditionEvaluator>,
}

impl FlowEngine {
    pub fn new(
        store: Arc<dyn FlowDefinitionStore>,
        actions: Arc<dyn ActionExecutor>,
        conditions: Arc<ConditionEvaluator>,
    ) -> Self {
        Self {
            store,
            actions,
            conditions,
        }
    }

    pub fn initial_state(&self) -> &str {
        self.store.initial_state()
    }

    pub fn conditions(&self) -> &ConditionEvaluator {
        &self.conditions
    }

    /// Resolve one step from `current_state`
    ///
    /// The action of the selected transition runs exactly once. On error the
    /// caller must leave its state pointer where it was.
    pub async fn step(
        &self,
        current_state: &str,
        context: &FlowContext,
    ) -> Result<StepOutcome, FlowError> {
        let selected = self.select(current_state, context).await?;
        let SelectedTransition { index, transition } = selected;

        let action = match transition.action {
            Some(action) => {
                tracing::debug!(
                    state = current_state,
                    action = %action.name,
                    action_type = %action.action_type,
                    "Executing transition action"
                );

                let delta = self
                    .actions
                    .execute(&action.action_type, &action.payload, context)
                    .await
                    .map_err(|source| {
                        tracing::error!(
                            state = current_state,
                            action = %action.name,
                            error = %source,
                            "Transition action failed"
                        );
                        FlowError::Action {
                            state: current_state.to_string(),
                            action: action.name.clone(),
                            source,
                        }
                    })?;

                Some(ActionOutcome {
                    name: action.name,
                    action_type: action.action_type,
                    delta,
                })
            }
            None => None,
        };

        tracing::info!(
            from = current_state,
            to = %transition.next_state,
            transition = index,
            action = action.as_ref().map(|a| a.name.as_str()).unwrap_or("-"),
            "Flow transition"
        );

        Ok(StepOutcome {
            from: current_state.to_string(),
            to: transition.next_state,
            transition_index: index,
            action,
        })
    }

    /// Pick the transition `step` would take, without running its action
    pub async fn select(
        &self,
        current_state: &str,
        context: &FlowContext,
    ) -> Result<SelectedTransition, FlowError> {
        if !self.store.state_exists(current_state).await? {
            tracing::error!(state = current_state, "Unknown flow state");
            return Err(FlowError::UnknownState(current_state.to_string()));
        }

        let transitions = self.store.list_transitions(current_state).await?;

        let found = transitions.into_iter().enumerate().find(|(_, t)| match &t.condition {
            None => true,
            Some(c) => self.conditions.evaluate(&c.expression, context),
        });

        let Some((index, transition)) = found else {
            tracing::warn!(state = current_state, "No applicable transition");
            return Err(FlowError::NoApplicableTransition {
                state: current_state.to_string(),
            });
        };

        if !self.store.state_exists(&transition.next_state).await? {
            tracing::error!(
                from = current_state,
                to = %transition.next_state,
                "Transition targets an undefined state"
            );
            return Err(FlowError::DanglingTransition {
                from: current_state.to_string(),
                to: transition.next_state,
            });
        }

        Ok(SelectedTransition { index, transition })
    }

    /// Outgoing transitions of a state, in priority order
    pub async fn describe(&self, state: &str) -> Result<Vec<TransitionInfo>, FlowError> {
        if !self.store.state_exists(state).await? {
            return Err(FlowError::UnknownState(state.to_string()));
        }

        let infos = self
            .store
            .list_transitions(state)
            .await?
            .into_iter()
            .map(|t| TransitionInfo {
                condition_known: t
                    .condition
                    .as_ref()
                    .map(|c| self.conditions.is_known(&c.expression))
                    .unwrap_or(true),
                condition: t.condition.map(|c| c.expression),
                action_type: t.action.as_ref().map(|a| a.action_type.clone()),
                action: t.action.map(|a| a.name),
                next_state: t.next_state,
            })
            .collect();

        Ok(infos)
    }
}
