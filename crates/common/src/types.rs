use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use uuid::Uuid;

/// Free-form payload fields carried alongside a notification's title and body
/// (icon, click URL, actions, ...). Merged verbatim into the pushed message.
pub type Extra = serde_json::Map<String, Value>;

/// Payload fields from a stored `data` value. Anything but a JSON object
/// (SQL `NULL`, `null`, arrays, scalars) carries no fields.
pub fn extra_from_json(data: Option<Value>) -> Extra {
    match data {
        Some(Value::Object(fields)) => fields,
        _ => Extra::new(),
    }
}

/// Lifecycle of a queued notification.
///
/// `Pending` is the only non-terminal state; the worker moves a row to `Sent`
/// or `Failed` exactly once and never writes it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, NotificationStatus::Pending)
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::Sent => write!(f, "sent"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A notification queued for fan-out (`pending_notifications` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    /// Owning user of the target endpoints. `None` broadcasts to every endpoint.
    #[serde(rename = "user_id")]
    pub target: Option<Uuid>,
    #[serde(rename = "data")]
    pub extra: Extra,
    pub status: NotificationStatus,
    /// Only set when `status` is `Failed`.
    pub error: Option<String>,
    pub sent_count: i32,
    pub failed_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for Notification {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let data: Option<Json<Value>> = row.try_get("data")?;

        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            target: row.try_get("user_id")?,
            extra: extra_from_json(data.map(|Json(value)| value)),
            status: row.try_get("status")?,
            error: row.try_get("error")?,
            sent_count: row.try_get("sent_count")?,
            failed_count: row.try_get("failed_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A registered push endpoint (`push_subscriptions` table).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Endpoint {
    pub id: Uuid,
    /// `None` marks a shared endpoint that only receives broadcasts.
    #[sqlx(rename = "user_id")]
    #[serde(rename = "user_id")]
    pub owner: Option<Uuid>,
    /// Transport-specific registration blob, passed through untouched.
    pub descriptor: String,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for enqueueing a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub title: String,
    pub body: String,
    pub target: Option<Uuid>,
    pub extra: Extra,
}

/// Per-endpoint outcome counts from one delivery attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTally {
    pub sent: u32,
    pub failed: u32,
}
