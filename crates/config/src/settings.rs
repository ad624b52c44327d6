//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Unknown condition names in flow files are errors instead of warnings
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Flow engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// System monitor windows and alert thresholds
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_engine()?;
        self.validate_monitor()?;
        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        if self.engine.initial_state.trim().is_empty() {
            return Err(ConfigError::MissingField("engine.initial_state".to_string()));
        }

        if self.engine.action_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.action_timeout_secs".to_string(),
                message: "Must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    fn validate_monitor(&self) -> Result<(), ConfigError> {
        let m = &self.monitor;

        if m.window_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "monitor.window_capacity".to_string(),
                message: "Rolling windows need a capacity of at least 1".to_string(),
            });
        }

        if m.alert_dedup_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "monitor.alert_dedup_window".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        for (field, value) in [
            ("monitor.high_error_rate", m.high_error_rate),
            ("monitor.low_ml_confidence", m.low_ml_confidence),
            ("monitor.low_cache_hit_rate", m.low_cache_hit_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must be between 0.0 and 1.0, got {}", value),
                });
            }
        }

        if !m.high_response_time_ms.is_finite() || m.high_response_time_ms <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "monitor.high_response_time_ms".to_string(),
                message: format!("Must be positive, got {}", m.high_response_time_ms),
            });
        }

        Ok(())
    }
}

/// Flow engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Entry state for new conversations
    #[serde(default = "default_initial_state")]
    pub initial_state: String,

    /// Path to the flow definition file (YAML)
    #[serde(default = "default_flow_definition_path")]
    pub flow_definition_path: String,

    /// Upper bound for a single action execution
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,

    /// Canned query results for `run_query` (YAML); unset means no backend
    #[serde(default)]
    pub query_data_path: Option<String>,
}

fn default_initial_state() -> String {
    collections_flow_core::DEFAULT_INITIAL_STATE.to_string()
}

fn default_flow_definition_path() -> String {
    "config/flows/collections.yaml".to_string()
}

fn default_action_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_state: default_initial_state(),
            flow_definition_path: default_flow_definition_path(),
            action_timeout_secs: default_action_timeout_secs(),
            query_data_path: None,
        }
    }
}

/// System monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Capacity of every rolling window
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Alerts included in a summary
    #[serde(default = "default_recent_alerts")]
    pub recent_alerts: usize,

    /// Same-kind alerts are suppressed while one is among the last N alerts
    #[serde(default = "default_alert_dedup_window")]
    pub alert_dedup_window: usize,

    /// Mean response time above which HIGH_RESPONSE_TIME fires
    #[serde(default = "default_high_response_time_ms")]
    pub high_response_time_ms: f64,

    /// Error rate above which HIGH_ERROR_RATE fires
    #[serde(default = "default_high_error_rate")]
    pub high_error_rate: f64,

    /// Requests needed before the error rate is judged
    #[serde(default = "default_min_requests_for_error_rate")]
    pub min_requests_for_error_rate: u64,

    /// Mean ML confidence below which LOW_ML_CONFIDENCE fires
    #[serde(default = "default_low_ml_confidence")]
    pub low_ml_confidence: f64,

    /// Cache hit rate below which LOW_CACHE_HIT_RATE fires
    #[serde(default = "default_low_cache_hit_rate")]
    pub low_cache_hit_rate: f64,

    /// Cache lookups needed before the hit rate is judged
    #[serde(default = "default_min_cache_samples")]
    pub min_cache_samples: u64,
}

fn default_window_capacity() -> usize {
    100
}
fn default_recent_alerts() -> usize {
    10
}
fn default_alert_dedup_window() -> usize {
    5
}
fn default_high_response_time_ms() -> f64 {
    2000.0
}
fn default_high_error_rate() -> f64 {
    0.10
}
fn default_min_requests_for_error_rate() -> u64 {
    10
}
fn default_low_ml_confidence() -> f64 {
    0.50
}
fn default_low_cache_hit_rate() -> f64 {
    0.30
}
fn default_min_cache_samples() -> u64 {
    20
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            recent_alerts: default_recent_alerts(),
            alert_dedup_window: default_alert_dedup_window(),
            high_response_time_ms: default_high_response_time_ms(),
            high_error_rate: default_high_error_rate(),
            min_requests_for_error_rate: default_min_requests_for_error_rate(),
            low_ml_confidence: default_low_ml_confidence(),
            low_cache_hit_rate: default_low_cache_hit_rate(),
            min_cache_samples: default_min_cache_samples(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (COLLECTIONS_FLOW_ prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with an explicit config directory
pub fn load_settings_from(config_dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder
        .add_source(File::with_name(&format!("{}/default", config_dir)).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(
            File::with_name(&format!("{}/{}", config_dir, env_name)).required(false),
        );
    }

    builder = builder.add_source(
        Environment::with_prefix("COLLECTIONS_FLOW")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.engine.initial_state, "start");
        assert_eq!(settings.monitor.window_capacity, 100);
        assert_eq!(settings.monitor.alert_dedup_window, 5);
        assert_eq!(settings.monitor.recent_alerts, 10);
        assert!((settings.monitor.high_response_time_ms - 2000.0).abs() < f64::EPSILON);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_monitor_validation() {
        let mut settings = Settings::default();

        settings.monitor.window_capacity = 0;
        assert!(settings.validate().is_err());
        settings.monitor.window_capacity = 100;

        settings.monitor.high_error_rate = 1.5;
        assert!(settings.validate().is_err());
        settings.monitor.high_error_rate = 0.1;

        settings.monitor.low_ml_confidence = -0.1;
        assert!(settings.validate().is_err());
        settings.monitor.low_ml_confidence = 0.5;

        settings.monitor.high_response_time_ms = 0.0;
        assert!(settings.validate().is_err());
        settings.monitor.high_response_time_ms = 2000.0;

        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_engine_validation() {
        let mut settings = Settings::default();
        settings.engine.initial_state = "  ".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingField(_))
        ));

        settings.engine.initial_state = "inicial".to_string();
        settings.engine.action_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "engine:\n  initial_state: inicial\nmonitor:\n  high_response_time_ms: 1500\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.yaml"),
            "environment: staging\nmonitor:\n  window_capacity: 50\n",
        )
        .unwrap();

        let dir_str = dir.path().to_str().unwrap();
        let settings = load_settings_from(dir_str, Some("staging")).unwrap();

        assert_eq!(settings.environment, RuntimeEnvironment::Staging);
        assert_eq!(settings.engine.initial_state, "inicial");
        assert_eq!(settings.monitor.window_capacity, 50);
        assert!((settings.monitor.high_response_time_ms - 1500.0).abs() < f64::EPSILON);
        // untouched fields keep their defaults
        assert_eq!(settings.monitor.alert_dedup_window, 5);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "monitor:\n  low_cache_hit_rate: 3.0\n",
        )
        .unwrap();

        let result = load_settings_from(dir.path().to_str().unwrap(), None);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
