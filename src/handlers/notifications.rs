use axum::{extract::State, Json};
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{errors::ServiceError, handlers::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationAckBody {
    #[schema(example = "OK")]
    pub status: String,
}

// POST /api/notification
#[utoipa::path(
    post,
    path = "/api/notification",
    request_body(content = String, description = "Raw Midtrans notification JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Notification acknowledged", body = NotificationAckBody),
        (status = 500, description = "Body is not a notification or its signature is invalid", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_notification(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<NotificationAckBody>, ServiceError> {
    state.services.notifications.handle(&body).await?;
    Ok(Json(NotificationAckBody {
        status: "OK".to_string(),
    }))
}
