//! Notification enqueue route.
//!
//! Accepts `{ title, body, user_id?, ...extra }` and stores it as a pending
//! notification for the push worker. Everything besides `title`, `body` and
//! `user_id` is kept verbatim as extra payload fields.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use agrosense_common::error::AppError;
use agrosense_common::types::{Extra, NewNotification, NotificationStatus};

use crate::middleware::auth::AuthCaller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/notifications", post(enqueue_notification))
}

/// POST /api/notifications — Queue a push notification.
async fn enqueue_notification(
    State(state): State<AppState>,
    caller: AuthCaller,
    Json(request): Json<Extra>,
) -> Result<Json<Value>, AppError> {
    let notification = parse_request(request)?;
    let id = insert_pending(&state.pool, &notification).await?;

    tracing::info!(
        notification_id = %id,
        caller = %caller.subject,
        user_id = ?notification.target,
        "Notification queued"
    );

    Ok(Json(json!({ "success": true, "id": id })))
}

/// Split the request object into the fixed fields and the extra payload.
pub fn parse_request(mut request: Extra) -> Result<NewNotification, AppError> {
    let title = take_text(&mut request, "title");
    let body = take_text(&mut request, "body");
    let (Some(title), Some(body)) = (title, body) else {
        return Err(AppError::Validation("Missing title or body".to_string()));
    };

    let target = match request.remove("user_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(
            Uuid::parse_str(&raw)
                .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?,
        ),
        Some(_) => return Err(AppError::Validation("user_id must be a UUID".to_string())),
    };

    Ok(NewNotification {
        title,
        body,
        target,
        extra: request,
    })
}

fn take_text(request: &mut Extra, key: &str) -> Option<String> {
    match request.remove(key) {
        Some(Value::String(text)) if !text.is_empty() => Some(text),
        _ => None,
    }
}

/// Insert a pending row and return its ID.
pub async fn insert_pending(pool: &PgPool, notification: &NewNotification) -> Result<Uuid, AppError> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO pending_notifications (title, body, user_id, data, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&notification.title)
    .bind(&notification.body)
    .bind(notification.target)
    .bind(Value::Object(notification.extra.clone()))
    .bind(NotificationStatus::Pending.to_string())
    .fetch_one(pool)
    .await?;

    Ok(id)
}
