//! Conversation state pointer
//!
//! A conversation owns its current state, context and transition history.
//! Messages are handled one at a time through `&mut self`; independent
//! conversations can run in parallel against one shared engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use collections_flow_core::{FlowContext, FlowError};

use crate::engine::{FlowEngine, StepOutcome};

/// One applied transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: String,
    pub to: String,
    pub action: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: Uuid,
    current_state: String,
    context: FlowContext,
    history: Vec<TransitionRecord>,
    started_at: DateTime<Utc>,
}

impl Conversation {
    /// New conversation at `initial_state` with an empty context
    pub fn start(initial_state: impl Into<String>) -> Self {
        Self::with_context(initial_state, FlowContext::new())
    }

    /// New conversation seeded with customer data
    pub fn with_context(initial_state: impl Into<String>, context: FlowContext) -> Self {
        let conversation = Self {
            id: Uuid::new_v4(),
            current_state: initial_state.into(),
            context,
            history: Vec::new(),
            started_at: Utc::now(),
        };
        tracing::debug!(
            conversation_id = %conversation.id,
            state = %conversation.current_state,
            "Conversation started"
        );
        conversation
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current_state(&self) -> &str {
        &self.current_state
    }

    pub fn context(&self) -> &FlowContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut FlowContext {
        &mut self.context
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Feed one inbound message through the engine
    ///
    /// On success the action's fields are merged into the context, the
    /// state pointer advances and the transition is recorded. On error only
    /// the stored message changes.
    pub async fn handle_message(
        &mut self,
        engine: &FlowEngine,
        message: impl Into<String>,
    ) -> Result<StepOutcome, FlowError> {
        self.context.set_message(message);

        let outcome = match engine.step(&self.current_state, &self.context).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    conversation_id = %self.id,
                    state = %self.current_state,
                    error = %e,
                    "Message did not advance the conversation"
                );
                return Err(e);
            }
        };

        self.apply(&outcome);
        Ok(outcome)
    }

    fn apply(&mut self, outcome: &StepOutcome) {
        if let Some(action) = &outcome.action {
            self.context.merge(action.delta.clone());
        }

        self.history.push(TransitionRecord {
            from: outcome.from.clone(),
            to: outcome.to.clone(),
            action: outcome.action.as_ref().map(|a| a.name.clone()),
            timestamp: Utc::now(),
        });
        self.current_state = outcome.to.clone();
    }
}
