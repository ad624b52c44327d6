//! Conversation context
//!
//! The context is a string-keyed bag of JSON values owned by callers. The
//! engine only reads it; predicates and actions agree on field names.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Key holding the latest inbound message
pub const MESSAGE_KEY: &str = "message";
/// Key used by older flow definitions for the inbound message
pub const LEGACY_MESSAGE_KEY: &str = "mensaje";

/// Fields returned by an action, merged into the context on success
pub type ContextDelta = HashMap<String, Value>;

/// Mapping from string keys to values for one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowContext {
    values: HashMap<String, Value>,
}

impl FlowContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context holding only a message
    pub fn with_message(message: impl Into<String>) -> Self {
        let mut ctx = Self::new();
        ctx.set_message(message);
        ctx
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Numeric view of a field; numeric strings are parsed, anything else is `None`
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Latest inbound message, empty when absent
    pub fn message(&self) -> &str {
        self.get_str(MESSAGE_KEY)
            .or_else(|| self.get_str(LEGACY_MESSAGE_KEY))
            .unwrap_or("")
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.values
            .insert(MESSAGE_KEY.to_string(), Value::String(message.into()));
    }

    /// Truthiness of a field: null, false, 0, "" and empty collections are false
    pub fn is_truthy(&self, key: &str) -> bool {
        self.values.get(key).map(value_is_truthy).unwrap_or(false)
    }

    /// Overwrite fields with the ones in `delta`
    pub fn merge(&mut self, delta: ContextDelta) {
        self.values.extend(delta);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Context as a JSON object, for handing to executors and templates
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl From<HashMap<String, Value>> for FlowContext {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, Value)> for FlowContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn value_is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
