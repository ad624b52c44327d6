//! Action executor trait

use async_trait::async_trait;

use crate::context::{ContextDelta, FlowContext};
use crate::error::ActionError;

/// Performs the side effect named by a flow action
///
/// Calls may block on I/O. The engine invokes the executor at most once per
/// accepted transition and never for transitions it skipped.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Run `action_type` with its payload against the conversation context
    ///
    /// Returns fields to merge into the context when the transition is
    /// applied.
    async fn execute(
        &self,
        action_type: &str,
        payload: &serde_json::Value,
        context: &FlowContext,
    ) -> Result<ContextDelta, ActionError>;
}
