use std::sync::Arc;

use uuid::Uuid;

use agrosense_common::types::Endpoint;

use crate::store::{EndpointStore, StoreError};

/// Maps a notification's target to the endpoints it fans out to.
#[derive(Clone)]
pub struct SubscriptionResolver {
    endpoints: Arc<dyn EndpointStore>,
}

impl SubscriptionResolver {
    pub fn new(endpoints: Arc<dyn EndpointStore>) -> Self {
        Self { endpoints }
    }

    /// `Some(owner)` → that owner's endpoints (possibly none).
    /// `None` → every endpoint, whoever owns it.
    ///
    /// Store failures are returned as-is; the caller fails the notification.
    pub async fn resolve(&self, target: Option<Uuid>) -> Result<Vec<Endpoint>, StoreError> {
        let endpoints = self.endpoints.endpoints_for(target).await?;

        tracing::debug!(
            owner = ?target,
            endpoints = endpoints.len(),
            "Resolved delivery endpoints"
        );

        Ok(endpoints)
    }
}
