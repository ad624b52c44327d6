//! Query action
//!
//! Runs a named query against an injected backend. Payload:
//!
//! ```yaml
//! query: cliente_por_documento   # backend-specific query name or text
//! params: [documento]            # context fields passed as parameters
//! found_key: cliente_encontrado  # optional flag written to the context
//! ```
//!
//! The first returned row is merged into the context.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use collections_flow_core::{ActionError, ContextDelta, FlowContext};

use crate::registry::{ActionHandler, ActionKind};

const DEFAULT_FOUND_KEY: &str = "cliente_encontrado";

/// Data source behind `run_query`
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run `query` with named parameters; `None` when no row matches
    async fn query(
        &self,
        query: &str,
        params: &HashMap<String, Value>,
    ) -> Result<Option<Map<String, Value>>, ActionError>;
}

pub struct RunQueryAction {
    backend: Option<Arc<dyn QueryBackend>>,
}

impl RunQueryAction {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Handler that reports `Unavailable` until a backend is wired in
    pub fn without_backend() -> Self {
        Self { backend: None }
    }
}

#[async_trait]
impl ActionHandler for RunQueryAction {
    fn kind(&self) -> ActionKind {
        ActionKind::RunQuery
    }

    async fn run(&self, payload: &Value, context: &FlowContext) -> Result<ContextDelta, ActionError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| ActionError::Unavailable("no query backend configured".to_string()))?;

        let query = payload
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::invalid_payload("run_query", "query is required"))?;

        let found_key = payload
            .get("found_key")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_FOUND_KEY);

        let mut params = HashMap::new();
        if let Some(names) = payload.get("params").and_then(Value::as_array) {
            for name in names.iter().filter_map(Value::as_str) {
                let value = context.get(name).cloned().unwrap_or(Value::Null);
                params.insert(name.to_string(), value);
            }
        }

        let row = backend.query(query, &params).await?;

        let mut delta = ContextDelta::new();
        delta.insert(found_key.to_string(), Value::Bool(row.is_some()));
        if let Some(row) = row {
            tracing::debug!(query, fields = row.len(), "Query returned a row");
            delta.extend(row);
        } else {
            tracing::debug!(query, "Query returned no rows");
        }
        Ok(delta)
    }
}

/// Lookup table used by `StaticQueryBackend`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticQuery {
    /// Parameter whose value selects the row
    pub key: String,
    #[serde(default)]
    pub rows: HashMap<String, Map<String, Value>>,
}

/// In-memory backend keyed by one parameter per query
///
/// Used for demos and tests; a database-backed implementation lives with
/// the embedding application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticQueryBackend {
    #[serde(default)]
    queries: HashMap<String, StaticQuery>,
}

impl StaticQueryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load tables from YAML (`queries: { name: { key, rows } }`)
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ActionError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ActionError::Unavailable(format!("Failed to read query data: {}", e))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| ActionError::Unavailable(format!("Failed to parse query data: {}", e)))
    }

    pub fn with_row(
        mut self,
        query: &str,
        key: &str,
        key_value: &str,
        row: Map<String, Value>,
    ) -> Self {
        let entry = self
            .queries
            .entry(query.to_string())
            .or_insert_with(|| StaticQuery {
                key: key.to_string(),
                rows: HashMap::new(),
            });
        entry.rows.insert(key_value.to_string(), row);
        self
    }
}

#[async_trait]
impl QueryBackend for StaticQueryBackend {
    async fn query(
        &self,
        query: &str,
        params: &HashMap<String, Value>,
    ) -> Result<Option<Map<String, Value>>, ActionError> {
        let table = self
            .queries
            .get(query)
            .ok_or_else(|| ActionError::failed(format!("Unknown query: {}", query)))?;

        let key_value = match params.get(&table.key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Null) | None => return Ok(None),
            Some(other) => other.to_string(),
        };

        Ok(table.rows.get(&key_value).cloned())
    }
}
