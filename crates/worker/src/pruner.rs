use std::sync::Arc;

use uuid::Uuid;

use crate::store::EndpointStore;

/// Result of a best-effort endpoint removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneOutcome {
    Deleted,
    AlreadyGone,
    /// The store refused; logged and otherwise ignored.
    Failed,
}

/// Removes endpoints the push service reported as gone.
#[derive(Clone)]
pub struct SubscriptionPruner {
    endpoints: Arc<dyn EndpointStore>,
}

impl SubscriptionPruner {
    pub fn new(endpoints: Arc<dyn EndpointStore>) -> Self {
        Self { endpoints }
    }

    /// Delete the endpoint. Never fails the caller.
    pub async fn prune(&self, endpoint_id: Uuid) -> PruneOutcome {
        match self.endpoints.delete(endpoint_id).await {
            Ok(true) => {
                tracing::info!(endpoint_id = %endpoint_id, "Pruned expired push endpoint");
                PruneOutcome::Deleted
            }
            Ok(false) => {
                tracing::debug!(endpoint_id = %endpoint_id, "Endpoint already removed");
                PruneOutcome::AlreadyGone
            }
            Err(e) => {
                tracing::warn!(
                    endpoint_id = %endpoint_id,
                    error = %e,
                    "Failed to prune expired push endpoint"
                );
                PruneOutcome::Failed
            }
        }
    }
}
