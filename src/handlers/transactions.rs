use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    errors::ServiceError, handlers::AppState, models::CheckoutRequest,
    services::transactions::CreatedTransaction,
};

// POST /api/create-transaction
#[utoipa::path(
    post,
    path = "/api/create-transaction",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Snap token issued and order recorded", body = CreatedTransaction),
        (status = 400, description = "Invalid product or customer details", body = crate::errors::ErrorResponse),
        (status = 500, description = "Payment provider failure or timeout, or storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CreatedTransaction>, ServiceError> {
    let Json(request) =
        payload.map_err(|e| ServiceError::BadRequest(format!("invalid request body: {}", e)))?;
    let created = state
        .services
        .transactions
        .create_transaction(&request)
        .await?;
    Ok(Json(created))
}
