//! Monitored dispatch
//!
//! The tier router (rules, classifier, fallback service or cache) lives
//! outside this crate and hands over a tagged [`TierDecision`]. The
//! dispatcher feeds the message through the conversation and reports the
//! outcome to the shared monitor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use collections_flow_core::{DecisionTier, FlowError};
use collections_flow_monitor::SystemMonitor;

use crate::conversation::Conversation;
use crate::engine::{FlowEngine, StepOutcome};

/// Context key holding the latest detected intention
pub const INTENTION_KEY: &str = "intencion";

/// What the tier router decided for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDecision {
    pub tier: DecisionTier,
    #[serde(default)]
    pub intention: Option<String>,
    /// Classifier confidence in [0, 1]; ignored for the rule and cache tiers
    #[serde(default)]
    pub confidence: f64,
}

impl TierDecision {
    pub fn new(tier: DecisionTier) -> Self {
        Self {
            tier,
            intention: None,
            confidence: 0.0,
        }
    }

    pub fn rule(intention: impl Into<String>) -> Self {
        Self::new(DecisionTier::Rule).with_intention(intention)
    }

    pub fn with_intention(mut self, intention: impl Into<String>) -> Self {
        self.intention = Some(intention.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

pub struct FlowDispatcher {
    engine: Arc<FlowEngine>,
    monitor: Arc<SystemMonitor>,
}

impl FlowDispatcher {
    pub fn new(engine: Arc<FlowEngine>, monitor: Arc<SystemMonitor>) -> Self {
        Self { engine, monitor }
    }

    pub fn engine(&self) -> &Arc<FlowEngine> {
        &self.engine
    }

    pub fn monitor(&self) -> &Arc<SystemMonitor> {
        &self.monitor
    }

    /// Drive one message and record it against the decision's tier
    pub async fn dispatch(
        &self,
        conversation: &mut Conversation,
        message: impl Into<String>,
        decision: &TierDecision,
    ) -> Result<StepOutcome, FlowError> {
        if let Some(intention) = &decision.intention {
            conversation
                .context_mut()
                .insert(INTENTION_KEY, Value::String(intention.clone()));
        }

        let started = Instant::now();
        let result = conversation.handle_message(&self.engine, message).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.monitor.record_request(
            decision.tier,
            elapsed_ms,
            result.is_ok(),
            decision.confidence,
        );

        tracing::debug!(
            conversation_id = %conversation.id(),
            tier = %decision.tier,
            elapsed_ms,
            ok = result.is_ok(),
            "Message dispatched"
        );

        result
    }
}
