//! Flow definition store trait

use async_trait::async_trait;

use crate::error::StoreError;
use crate::flow::ResolvedTransition;

/// Source of flow definitions
///
/// Implementations must return transitions in a stable declared order; the
/// engine takes the first one whose condition holds.
#[async_trait]
pub trait FlowDefinitionStore: Send + Sync {
    /// Outgoing transitions of `state`, in priority order
    ///
    /// An unknown state yields an empty list; use [`state_exists`] to tell
    /// the two apart.
    ///
    /// [`state_exists`]: FlowDefinitionStore::state_exists
    async fn list_transitions(&self, state: &str) -> Result<Vec<ResolvedTransition>, StoreError>;

    /// Whether a state with this name is defined
    async fn state_exists(&self, state: &str) -> Result<bool, StoreError>;

    /// Entry state for new conversations
    fn initial_state(&self) -> &str {
        crate::flow::DEFAULT_INITIAL_STATE
    }
}
