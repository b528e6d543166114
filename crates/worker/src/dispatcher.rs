//! Fan-out of one notification to its resolved endpoints.
//!
//! Every endpoint gets the same serialized payload. A failure on one endpoint
//! never stops delivery to the rest; it is classified, counted and, when the
//! push service says the endpoint is gone, the endpoint is pruned before the
//! next send.

use std::sync::Arc;

use serde_json::Value;

use agrosense_common::types::{DeliveryTally, Endpoint, Notification};

use crate::pruner::SubscriptionPruner;
use crate::transport::{DeliveryFailure, PushTransport};

/// Sends a notification's payload to each endpoint and tallies the outcome.
#[derive(Clone)]
pub struct DeliveryDispatcher {
    transport: Arc<dyn PushTransport>,
    pruner: SubscriptionPruner,
}

impl DeliveryDispatcher {
    pub fn new(transport: Arc<dyn PushTransport>, pruner: SubscriptionPruner) -> Self {
        Self { transport, pruner }
    }

    /// Flat message object: `title`, `body`, then every `extra` field.
    /// Extra fields win on key collisions.
    pub fn build_payload(notification: &Notification) -> Value {
        let mut payload = serde_json::Map::with_capacity(notification.extra.len() + 2);
        payload.insert("title".into(), Value::String(notification.title.clone()));
        payload.insert("body".into(), Value::String(notification.body.clone()));
        for (key, value) in &notification.extra {
            payload.insert(key.clone(), value.clone());
        }
        Value::Object(payload)
    }

    /// Attempt delivery to every endpoint, sequentially.
    pub async fn dispatch(
        &self,
        notification: &Notification,
        endpoints: &[Endpoint],
    ) -> Result<DeliveryTally, serde_json::Error> {
        let payload = serde_json::to_vec(&Self::build_payload(notification))?;
        let mut tally = DeliveryTally::default();

        for endpoint in endpoints {
            match self.transport.send(&endpoint.descriptor, &payload).await {
                Ok(()) => tally.sent += 1,
                Err(err) => {
                    tally.failed += 1;

                    match DeliveryFailure::classify(&err) {
                        DeliveryFailure::PermanentSubscription => {
                            tracing::info!(
                                notification_id = %notification.id,
                                endpoint_id = %endpoint.id,
                                status = ?err.status(),
                                "Push endpoint no longer valid"
                            );
                            self.pruner.prune(endpoint.id).await;
                        }
                        DeliveryFailure::TransientDelivery => {
                            tracing::warn!(
                                notification_id = %notification.id,
                                endpoint_id = %endpoint.id,
                                status = ?err.status(),
                                error = %err,
                                "Push delivery failed"
                            );
                        }
                    }
                }
            }
        }

        Ok(tally)
    }
}
