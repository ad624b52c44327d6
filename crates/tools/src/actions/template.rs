//! Templated reply action
//!
//! Renders `payload.template`, replacing `{field}` placeholders with context
//! values. The text lands in `payload.output_key` (default `respuesta`).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use collections_flow_core::{ActionError, ContextDelta, FlowContext};

use crate::registry::{ActionHandler, ActionKind};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

const DEFAULT_OUTPUT_KEY: &str = "respuesta";

/// Render a template against the context; unknown fields render empty
pub fn render_template(template: &str, context: &FlowContext) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match context.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                tracing::debug!(field = &caps[1], "Template field missing from context");
                String::new()
            }
            Some(other) => other.to_string(),
        })
        .into_owned()
}

pub struct SendTemplateAction;

impl SendTemplateAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SendTemplateAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for SendTemplateAction {
    fn kind(&self) -> ActionKind {
        ActionKind::SendTemplate
    }

    async fn run(&self, payload: &Value, context: &FlowContext) -> Result<ContextDelta, ActionError> {
        // A bare string payload is the template itself
        let template = match payload {
            Value::String(s) => s.as_str(),
            _ => payload
                .get("template")
                .and_then(Value::as_str)
                .ok_or_else(|| ActionError::invalid_payload("send_template", "template is required"))?,
        };

        let output_key = payload
            .get("output_key")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_OUTPUT_KEY);

        let text = render_template(template, context);

        let mut delta = ContextDelta::new();
        delta.insert(output_key.to_string(), Value::String(text));
        Ok(delta)
    }
}
