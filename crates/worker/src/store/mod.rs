//! Persistence seams used by the delivery worker.
//!
//! The worker never talks to Postgres directly; it goes through these two
//! traits so the delivery cycle can be exercised against in-memory stores.

mod postgres;

pub use postgres::{PgEndpointStore, PgNotificationQueue};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use agrosense_common::types::{DeliveryTally, Endpoint, Notification};

/// Failure reading or writing the queue or endpoint tables.
///
/// Displays as the underlying fault's message; that text is what a failed
/// notification records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

/// Queue of notifications awaiting delivery.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Oldest-first pending notifications, at most `limit` rows.
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<Notification>, StoreError>;

    /// Pending → Sent, clearing any error and recording the tally.
    /// Returns `false` if the row was no longer pending.
    async fn mark_sent(&self, id: Uuid, tally: DeliveryTally) -> Result<bool, StoreError>;

    /// Pending → Failed with the failure message.
    /// Returns `false` if the row was no longer pending.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, StoreError>;
}

/// Registered delivery endpoints.
#[async_trait]
pub trait EndpointStore: Send + Sync {
    /// Endpoints owned by `owner`, or every endpoint when `owner` is `None`.
    async fn endpoints_for(&self, owner: Option<Uuid>) -> Result<Vec<Endpoint>, StoreError>;

    /// Delete by id. Returns `false` when the endpoint was already gone.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
