//! Queue poller: drives the delivery cycle.
//!
//! On every tick:
//! 1. Read up to `batch_size` pending notifications, oldest first
//! 2. For each one, in order: resolve endpoints → dispatch → reconcile status
//!
//! Notifications are processed strictly one after another. Anything left
//! pending (batch overflow, a failed status write, a crash mid-batch) is
//! picked up again on a later tick.

use std::sync::Arc;

use agrosense_common::types::{Notification, NotificationStatus};

use crate::dispatcher::DeliveryDispatcher;
use crate::pruner::SubscriptionPruner;
use crate::reconciler::{ProcessingOutcome, StatusReconciler};
use crate::resolver::SubscriptionResolver;
use crate::store::{EndpointStore, NotificationQueue, StoreError};
use crate::ticker::Ticker;
use crate::transport::PushTransport;

/// Default number of notifications read per tick.
pub const DEFAULT_BATCH_SIZE: u32 = 10;

/// Summary of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Pending notifications read this cycle.
    pub selected: usize,
    /// Notifications moved to `Sent`.
    pub sent: usize,
    /// Notifications moved to `Failed`.
    pub failed: usize,
    /// Notifications whose status could not be written.
    pub unreconciled: usize,
}

/// The delivery worker's scheduling loop.
pub struct QueuePoller {
    queue: Arc<dyn NotificationQueue>,
    resolver: SubscriptionResolver,
    dispatcher: DeliveryDispatcher,
    reconciler: StatusReconciler,
    batch_size: u32,
}

impl QueuePoller {
    pub fn new(
        queue: Arc<dyn NotificationQueue>,
        endpoints: Arc<dyn EndpointStore>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let pruner = SubscriptionPruner::new(endpoints.clone());
        Self {
            resolver: SubscriptionResolver::new(endpoints),
            dispatcher: DeliveryDispatcher::new(transport, pruner),
            reconciler: StatusReconciler::new(queue.clone()),
            queue,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the per-tick batch limit (minimum 1).
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run one cycle per tick until the ticker stops.
    pub async fn run<T: Ticker>(&self, ticker: &mut T) {
        tracing::info!(batch_size = self.batch_size, "Queue poller started");

        while ticker.tick().await {
            match self.run_cycle().await {
                Ok(report) if report.selected > 0 => {
                    tracing::info!(
                        selected = report.selected,
                        sent = report.sent,
                        failed = report.failed,
                        unreconciled = report.unreconciled,
                        "Poll cycle complete"
                    );
                }
                Ok(_) => tracing::debug!("No pending notifications"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read pending notifications");
                }
            }
        }

        tracing::info!("Queue poller stopped");
    }

    /// Read one batch and process it to completion.
    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let batch = self.queue.fetch_pending(self.batch_size).await?;
        let mut report = CycleReport {
            selected: batch.len(),
            ..Default::default()
        };

        for notification in &batch {
            let outcome = self.process(notification).await;

            match self.reconciler.reconcile(notification.id, &outcome).await {
                Ok(Some(NotificationStatus::Sent)) => report.sent += 1,
                Ok(Some(NotificationStatus::Failed)) => report.failed += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(
                        notification_id = %notification.id,
                        error = %e,
                        "Failed to record notification status"
                    );
                    report.unreconciled += 1;
                }
            }
        }

        Ok(report)
    }

    /// Resolve and dispatch a single notification.
    async fn process(&self, notification: &Notification) -> ProcessingOutcome {
        let endpoints = match self.resolver.resolve(notification.target).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                tracing::error!(
                    notification_id = %notification.id,
                    error = %e,
                    "Notification send failed"
                );
                return ProcessingOutcome::Aborted(e.to_string());
            }
        };

        match self.dispatcher.dispatch(notification, &endpoints).await {
            Ok(tally) => {
                tracing::info!(
                    notification_id = %notification.id,
                    sent = tally.sent,
                    failed = tally.failed,
                    "Notification sent"
                );
                ProcessingOutcome::Dispatched(tally)
            }
            Err(e) => {
                tracing::error!(
                    notification_id = %notification.id,
                    error = %e,
                    "Failed to encode notification payload"
                );
                ProcessingOutcome::Aborted(e.to_string())
            }
        }
    }
}
