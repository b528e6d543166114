use std::sync::Arc;

use uuid::Uuid;

use agrosense_common::types::{DeliveryTally, NotificationStatus};

use crate::store::{NotificationQueue, StoreError};

/// How one processing attempt of a notification ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Resolution and dispatch ran to completion, whatever the per-endpoint tally.
    Dispatched(DeliveryTally),
    /// An infrastructure fault stopped the attempt.
    Aborted(String),
}

impl ProcessingOutcome {
    /// Terminal status for this outcome. Per-endpoint failures do not make a
    /// notification `Failed`.
    pub fn terminal_status(&self) -> NotificationStatus {
        match self {
            ProcessingOutcome::Dispatched(_) => NotificationStatus::Sent,
            ProcessingOutcome::Aborted(_) => NotificationStatus::Failed,
        }
    }
}

/// Writes a notification's terminal status.
#[derive(Clone)]
pub struct StatusReconciler {
    queue: Arc<dyn NotificationQueue>,
}

impl StatusReconciler {
    pub fn new(queue: Arc<dyn NotificationQueue>) -> Self {
        Self { queue }
    }

    /// Persist the outcome. Returns the status written, or `None` when the
    /// row had already left `Pending` and was left untouched.
    pub async fn reconcile(
        &self,
        notification_id: Uuid,
        outcome: &ProcessingOutcome,
    ) -> Result<Option<NotificationStatus>, StoreError> {
        let transitioned = match outcome {
            ProcessingOutcome::Dispatched(tally) => {
                self.queue.mark_sent(notification_id, *tally).await?
            }
            ProcessingOutcome::Aborted(error) => {
                self.queue.mark_failed(notification_id, error).await?
            }
        };

        if !transitioned {
            tracing::warn!(
                notification_id = %notification_id,
                "Notification no longer pending, status left unchanged"
            );
            return Ok(None);
        }

        Ok(Some(outcome.terminal_status()))
    }
}
