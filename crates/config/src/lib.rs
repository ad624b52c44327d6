//! Configuration management for the collections flow agent
//!
//! Supports loading configuration from:
//! - YAML/TOML files (config/default, config/{env})
//! - Environment variables (COLLECTIONS_FLOW_ prefix)
//!
//! Flow definitions (states, conditions, actions, transitions) live in a
//! separate YAML file referenced by `engine.flow_definition_path`.

pub mod flows;
pub mod settings;

pub use flows::FlowDefinitionFile;
pub use settings::{
    load_settings, load_settings_from, EngineConfig, MonitorConfig, ObservabilityConfig,
    RuntimeEnvironment, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
