//! Action Registry
//!
//! Maps action types to handlers and executes them with timeout protection.
//! Each call runs on its own task: a panicking handler becomes
//! `ActionError::Failed`, and dropping the call aborts the handler.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use collections_flow_core::{ActionError, ActionExecutor, ContextDelta, FlowContext};

use crate::actions::{
    CreatePaymentPlansAction, EscalateSupervisorAction, GenerateProposalAction, QueryBackend,
    RunQueryAction, ScheduleReminderAction, SendTemplateAction, VerifyContactAction,
};

/// Default timeout for action execution (30 seconds)
pub const DEFAULT_ACTION_TIMEOUT_SECS: u64 = 30;

/// Known action types
///
/// Flow files name actions by string; the string is parsed once into this
/// closed set. Types registered by the embedding application land in
/// `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    RunQuery,
    SendTemplate,
    CreatePaymentPlans,
    GenerateProposal,
    VerifyContact,
    ScheduleReminder,
    EscalateSupervisor,
    Custom(String),
}

impl ActionKind {
    pub fn parse(action_type: &str) -> Self {
        match action_type.trim() {
            "run_query" => Self::RunQuery,
            "send_template" => Self::SendTemplate,
            "crear_planes_pago" => Self::CreatePaymentPlans,
            "generar_propuesta" => Self::GenerateProposal,
            "verificar_contacto" => Self::VerifyContact,
            "enviar_recordatorio" => Self::ScheduleReminder,
            "escalar_supervisor" => Self::EscalateSupervisor,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RunQuery => "run_query",
            Self::SendTemplate => "send_template",
            Self::CreatePaymentPlans => "crear_planes_pago",
            Self::GenerateProposal => "generar_propuesta",
            Self::VerifyContact => "verificar_contacto",
            Self::ScheduleReminder => "enviar_recordatorio",
            Self::EscalateSupervisor => "escalar_supervisor",
            Self::Custom(name) => name.as_str(),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A side effect that can be attached to a flow transition
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Action type this handler serves
    fn kind(&self) -> ActionKind;

    /// Run the action; the returned fields are merged into the context
    async fn run(&self, payload: &Value, context: &FlowContext)
        -> Result<ContextDelta, ActionError>;

    /// Per-handler timeout, falling back to the registry default
    fn timeout_secs(&self) -> Option<u64> {
        None
    }
}

/// Action registry
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
    default_timeout_secs: u64,
}

impl ActionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            default_timeout_secs: DEFAULT_ACTION_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs.max(1);
        self
    }

    /// Register a handler, replacing any previous one of the same kind
    pub fn register<H: ActionHandler + 'static>(&mut self, handler: H) {
        self.register_arc(Arc::new(handler));
    }

    pub fn register_arc(&mut self, handler: Arc<dyn ActionHandler>) {
        let kind = handler.kind();
        if self.handlers.insert(kind.clone(), handler).is_some() {
            tracing::debug!(action = %kind, "Replaced action handler");
        }
    }

    pub fn get(&self, kind: &ActionKind) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(kind)
    }

    pub fn has(&self, action_type: &str) -> bool {
        self.handlers.contains_key(&ActionKind::parse(action_type))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered action type names
    pub fn action_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for ActionRegistry {
    async fn execute(
        &self,
        action_type: &str,
        payload: &Value,
        context: &FlowContext,
    ) -> Result<ContextDelta, ActionError> {
        let kind = ActionKind::parse(action_type);
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| ActionError::UnknownAction(action_type.to_string()))?;

        let timeout_secs = handler.timeout_secs().unwrap_or(self.default_timeout_secs);

        tracing::trace!(
            action = %kind,
            timeout_secs = timeout_secs,
            "Executing action with timeout"
        );

        let task_handler = Arc::clone(handler);
        let task_payload = payload.clone();
        let task_context = context.clone();
        let mut task = AbortOnDrop(tokio::spawn(async move {
            task_handler.run(&task_payload, &task_context).await
        }));

        match tokio::time::timeout(Duration::from_secs(timeout_secs), &mut task.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => {
                tracing::error!(action = %kind, "Action handler panicked");
                Err(ActionError::failed(format!("{} panicked", kind)))
            }
            Ok(Err(_)) => Err(ActionError::Cancelled(kind.as_str().to_string())),
            Err(_elapsed) => Err(ActionError::timeout(kind.as_str(), timeout_secs)),
        }
    }
}

/// Handler task that is aborted when the caller stops waiting for it
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Registry with every built-in action
///
/// Without a backend `run_query` is still registered but fails with
/// `ActionError::Unavailable`.
pub fn create_default_registry(query_backend: Option<Arc<dyn QueryBackend>>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    registry.register(SendTemplateAction::new());
    registry.register(CreatePaymentPlansAction::new());
    registry.register(GenerateProposalAction::new());
    registry.register(VerifyContactAction::new());
    registry.register(ScheduleReminderAction::new());
    registry.register(EscalateSupervisorAction::new());

    registry.register(match query_backend {
        Some(backend) => RunQueryAction::new(backend),
        None => RunQueryAction::without_backend(),
    });

    tracing::info!(
        action_count = registry.len(),
        actions = ?registry.action_types(),
        "Created action registry"
    );

    registry
}
