use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    catalog::{format_rupiah, ProductCode},
    errors::ServiceError,
    handlers::AppState,
    models::{Order, OrderStatus},
    ApiResponse,
};

/// Public view of a stored order; customer contact details are withheld.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderView {
    pub order_id: String,
    pub product_code: ProductCode,
    pub quantity: u32,
    pub gross_amount: i64,
    #[schema(example = "Rp 150.000")]
    pub amount_label: String,
    pub status: OrderStatus,
    pub payment_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            amount_label: format_rupiah(order.gross_amount),
            order_id: order.order_id,
            product_code: order.product_code,
            quantity: order.quantity,
            gross_amount: order.gross_amount,
            status: order.status,
            payment_type: order.payment_type,
            created_at: order.created_at,
            updated_at: order.updated_at,
            expires_at: order.expires_at,
        }
    }
}

// GET /api/orders/:order_id
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = String, Path, description = "Order reference")),
    responses(
        (status = 200, description = "Locally recorded order", body = OrderView),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<OrderView>>, ServiceError> {
    let order = state.services.status.find_order(&order_id).await?;
    Ok(Json(ApiResponse::success(order.into())))
}
