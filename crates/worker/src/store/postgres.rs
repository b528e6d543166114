use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use agrosense_common::types::{DeliveryTally, Endpoint, Notification, NotificationStatus};

use super::{EndpointStore, NotificationQueue, StoreError};

/// Counts beyond `INTEGER` range are stored as `i32::MAX`.
fn count_column(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// `pending_notifications` table.
#[derive(Clone)]
pub struct PgNotificationQueue {
    pool: PgPool,
}

impl PgNotificationQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationQueue for PgNotificationQueue {
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<Notification>, StoreError> {
        let rows: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT id, title, body, user_id, data, status, error,
                   sent_count, failed_count, created_at, updated_at
            FROM pending_notifications
            WHERE status = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(NotificationStatus::Pending.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn mark_sent(&self, id: Uuid, tally: DeliveryTally) -> Result<bool, StoreError> {
        // The status guard keeps terminal rows untouched.
        let result = sqlx::query(
            r#"
            UPDATE pending_notifications
            SET status = $1, error = NULL, sent_count = $2, failed_count = $3, updated_at = NOW()
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(NotificationStatus::Sent.to_string())
        .bind(count_column(tally.sent))
        .bind(count_column(tally.failed))
        .bind(id)
        .bind(NotificationStatus::Pending.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_notifications
            SET status = $1, error = $2, updated_at = NOW()
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(NotificationStatus::Failed.to_string())
        .bind(error)
        .bind(id)
        .bind(NotificationStatus::Pending.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// `push_subscriptions` table.
#[derive(Clone)]
pub struct PgEndpointStore {
    pool: PgPool,
}

impl PgEndpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EndpointStore for PgEndpointStore {
    async fn endpoints_for(&self, owner: Option<Uuid>) -> Result<Vec<Endpoint>, StoreError> {
        let rows: Vec<Endpoint> = match owner {
            Some(owner) => {
                sqlx::query_as(
                    r#"
                    SELECT id, user_id, subscription::text AS descriptor, created_at
                    FROM push_subscriptions
                    WHERE user_id = $1
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(owner)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, user_id, subscription::text AS descriptor, created_at
                    FROM push_subscriptions
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
