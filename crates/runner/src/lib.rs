//! Collections Flow Runner
//!
//! Wires settings, flow definitions, actions, conditions and the monitor
//! into one [`AppState`] and drives conversations from line-oriented input.

pub mod routing;
pub mod state;

pub use routing::{extract_document, route_message, DOCUMENT_KEY};
pub use state::AppState;

use collections_flow_config::{ConfigError, Settings};
use collections_flow_core::ActionError;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Runner errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Query data error: {0}")]
    QueryData(#[from] ActionError),

    #[error("Flow references unknown conditions: {}", .0.join(", "))]
    UnknownConditions(Vec<String>),

    #[error("Flow references unregistered action types: {}", .0.join(", "))]
    UnknownActions(Vec<String>),

    #[error("Configured initial state '{configured}' differs from the flow's '{flow}'")]
    InitialStateMismatch { configured: String, flow: String },
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `observability.log_level`. The target prefix
/// covers every `collections_flow_*` crate. Logs go to stderr so replies
/// on stdout stay clean.
pub fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("collections_flow={}", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    subscriber.with(fmt_layer).init();
}
