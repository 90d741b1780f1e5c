use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": false,
    "error": "Bad Request",
    "message": "Invalid product type. Choose: basic, colorful, or ultimate",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// HTTP status category (e.g., "Bad Request", "Internal Server Error")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid product type: {0}")]
    InvalidProduct(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Payment provider error: {0}")]
    ProviderError(String),

    #[error("Payment provider timed out: {0}")]
    ProviderTimeout(String),

    #[error("Unauthenticated notification: {0}")]
    UnauthenticatedNotification(String),

    #[error("Malformed notification: {0}")]
    MalformedNotification(String),

    #[error("Status query failed: {0}")]
    StatusQueryFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidProduct(_)
            | Self::MissingField(_)
            | Self::InvalidFormat(_)
            | Self::InvalidAmount(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnauthenticatedNotification(_)
            | Self::MalformedNotification(_)
            | Self::ProviderTimeout(_)
            | Self::ProviderError(_)
            | Self::StatusQueryFailed(_)
            | Self::DatabaseError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Provider and storage failures return generic messages to avoid leaking details.
    pub fn response_message(&self) -> String {
        match self {
            Self::InvalidProduct(_) => {
                "Invalid product type. Choose: basic, colorful, or ultimate".to_string()
            }
            Self::ProviderError(_) => "Failed to create transaction".to_string(),
            Self::ProviderTimeout(_) => {
                "Payment provider did not respond in time, please retry".to_string()
            }
            Self::StatusQueryFailed(_) => "Failed to check transaction status".to_string(),
            Self::UnauthenticatedNotification(_) | Self::MalformedNotification(_) => {
                "Failed to process notification".to_string()
            }
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            success: false,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::MissingField("customer_email".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert!(!payload.success);
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::InvalidProduct("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidFormat("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::UnauthenticatedNotification("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::MalformedNotification("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::ProviderTimeout("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::ProviderError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::StatusQueryFailed("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn response_message_hides_provider_details() {
        assert_eq!(
            ServiceError::ProviderError("401 access denied, server key sk-123".into())
                .response_message(),
            "Failed to create transaction"
        );
        assert_eq!(
            ServiceError::StatusQueryFailed("connection reset".into()).response_message(),
            "Failed to check transaction status"
        );
        assert_eq!(
            ServiceError::MissingField("customer_name is required".into()).response_message(),
            "Missing field: customer_name is required"
        );
    }
}
