//! Application State
//!
//! Everything a conversation needs, built once from [`Settings`] and shared.

use std::sync::Arc;

use collections_flow_agent::{
    ConditionEvaluator, Conversation, FlowDispatcher, FlowEngine, InMemoryFlowStore,
};
use collections_flow_config::{FlowDefinitionFile, Settings};
use collections_flow_monitor::SystemMonitor;
use collections_flow_tools::{create_default_registry, QueryBackend, StaticQueryBackend};

use crate::RunnerError;

/// Conditions the shipped flows use beyond the built-in set
const FLAG_CONDITIONS: &[&str] = &["cliente_encontrado"];

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub engine: Arc<FlowEngine>,
    pub monitor: Arc<SystemMonitor>,
    pub dispatcher: Arc<FlowDispatcher>,
    store: Arc<InMemoryFlowStore>,
}

impl AppState {
    /// Load the flow file and wire the engine, registry and monitor
    ///
    /// Unresolvable condition names and unregistered action types are
    /// logged; strict environments refuse to start with them. The configured
    /// `engine.initial_state` must match the flow file's.
    pub fn from_settings(settings: Settings) -> Result<Self, RunnerError> {
        let defs = FlowDefinitionFile::load(&settings.engine.flow_definition_path)?;
        let store = Arc::new(InMemoryFlowStore::from_definitions(&defs)?);

        if defs.initial_state != settings.engine.initial_state {
            return Err(RunnerError::InitialStateMismatch {
                configured: settings.engine.initial_state.clone(),
                flow: defs.initial_state.clone(),
            });
        }

        let query_backend: Option<Arc<dyn QueryBackend>> = match &settings.engine.query_data_path
        {
            Some(path) => {
                let backend = StaticQueryBackend::from_yaml_file(path)?;
                tracing::info!(path = %path, "Loaded query data");
                Some(Arc::new(backend))
            }
            None => {
                tracing::warn!("No query data configured, run_query actions will fail");
                None
            }
        };

        let registry = create_default_registry(query_backend)
            .with_timeout_secs(settings.engine.action_timeout_secs);

        let mut conditions = ConditionEvaluator::new();
        for flag in FLAG_CONDITIONS {
            conditions.register_flag(*flag);
        }

        let unknown_conditions: Vec<String> = store
            .condition_expressions()
            .into_iter()
            .filter(|expr| !conditions.is_known(expr))
            .map(String::from)
            .collect();
        let unknown_actions: Vec<String> = store
            .action_types()
            .into_iter()
            .filter(|t| !registry.has(t))
            .map(String::from)
            .collect();

        let strict = settings.environment.is_strict();
        if !unknown_conditions.is_empty() {
            tracing::warn!(conditions = ?unknown_conditions, "Flow uses unknown conditions, they evaluate to false");
            if strict {
                return Err(RunnerError::UnknownConditions(unknown_conditions));
            }
        }
        if !unknown_actions.is_empty() {
            tracing::warn!(actions = ?unknown_actions, "Flow uses unregistered action types");
            if strict {
                return Err(RunnerError::UnknownActions(unknown_actions));
            }
        }

        let engine = Arc::new(FlowEngine::new(
            store.clone(),
            Arc::new(registry),
            Arc::new(conditions),
        ));
        let monitor = Arc::new(SystemMonitor::new(settings.monitor.clone()));
        let dispatcher = Arc::new(FlowDispatcher::new(engine.clone(), monitor.clone()));

        tracing::info!(
            states = store.state_count(),
            transitions = store.transition_count(),
            initial_state = %engine.initial_state(),
            "Flow engine ready"
        );

        Ok(Self {
            settings: Arc::new(settings),
            engine,
            monitor,
            dispatcher,
            store,
        })
    }

    /// New conversation at the flow's entry state
    pub fn start_conversation(&self) -> Conversation {
        Conversation::start(self.engine.initial_state())
    }

    pub fn store(&self) -> &Arc<InMemoryFlowStore> {
        &self.store
    }
}
