use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{errors::ServiceError, handlers::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionStatusResponse {
    pub success: bool,
    /// Provider snapshot, passed through unchanged
    #[schema(value_type = Object)]
    pub data: Value,
}

// GET /api/transaction/:order_id
#[utoipa::path(
    get,
    path = "/api/transaction/{order_id}",
    params(("order_id" = String, Path, description = "Order reference, e.g. MOCHI-1718000000000-7Q2KX9D4ZM")),
    responses(
        (status = 200, description = "Provider transaction snapshot", body = TransactionStatusResponse),
        (status = 500, description = "Status could not be retrieved in time", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn transaction_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<TransactionStatusResponse>, ServiceError> {
    let snapshot = state.services.status.get_status(&order_id).await?;
    Ok(Json(TransactionStatusResponse {
        success: true,
        data: snapshot,
    }))
}
