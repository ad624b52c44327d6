//! Error types
//!
//! Errors that change the caller's control flow are surfaced; errors that
//! can be substituted with a safe default (an unknown condition evaluates to
//! false) never leave the component that absorbed them.

use thiserror::Error;

/// Failure reported by an action executor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    #[error("Invalid payload for {action}: {message}")]
    InvalidPayload { action: String, message: String },

    #[error("Action backend unavailable: {0}")]
    Unavailable(String),

    #[error("Action failed: {0}")]
    Failed(String),

    #[error("Action {action} timed out after {timeout_secs}s")]
    Timeout { action: String, timeout_secs: u64 },

    #[error("Action {0} was cancelled")]
    Cancelled(String),
}

impl ActionError {
    pub fn invalid_payload(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn timeout(action: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            action: action.into(),
            timeout_secs,
        }
    }
}

/// Failure reading flow definitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Flow definitions unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt flow definition: {0}")]
    Corrupt(String),
}

/// Failure inside a condition predicate; absorbed by the evaluator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Missing context field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Predicate failed: {0}")]
    Failed(String),
}

/// Errors surfaced by the flow engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("Unknown flow state: {0}")]
    UnknownState(String),

    #[error("Transition from {from} targets missing state {to}")]
    DanglingTransition { from: String, to: String },

    #[error("No applicable transition from state {state}")]
    NoApplicableTransition { state: String },

    #[error("Action {action} failed in state {state}: {source}")]
    Action {
        state: String,
        action: String,
        #[source]
        source: ActionError,
    },

    #[error("Flow store error: {0}")]
    Store(#[from] StoreError),
}

impl FlowError {
    /// Definition problems: not retryable without fixing the flow
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownState(_) | Self::DanglingTransition { .. }
        )
    }

    /// No transition matched; callers usually re-prompt
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoApplicableTransition { .. })
    }

    /// The selected transition's action failed; replaying is safe
    pub fn is_action_error(&self) -> bool {
        matches!(self, Self::Action { .. })
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_error_classification() {
        assert!(FlowError::UnknownState("x".into()).is_configuration_error());
        assert!(FlowError::DanglingTransition {
            from: "a".into(),
            to: "b".into()
        }
        .is_configuration_error());

        let no_match = FlowError::NoApplicableTransition { state: "a".into() };
        assert!(no_match.is_no_match());
        assert!(!no_match.is_action_error());

        let action = FlowError::Action {
            state: "a".into(),
            action: "notify".into(),
            source: ActionError::failed("boom"),
        };
        assert!(action.is_action_error());
        assert!(!action.is_no_match());
        assert!(!action.is_configuration_error());
    }

    #[test]
    fn test_error_messages() {
        let err = ActionError::timeout("run_query", 30);
        assert_eq!(err.to_string(), "Action run_query timed out after 30s");

        let err: FlowError = StoreError::Unavailable("db down".into()).into();
        assert_eq!(err.to_string(), "Flow store error: Flow definitions unavailable: db down");
    }
}
