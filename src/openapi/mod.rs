use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dasai Mochi Store API",
        version = "0.1.0",
        description = r#"
# Dasai Mochi Checkout API

Checkout backend for the Dasai Mochi store. Payments are collected through
Midtrans Snap; the hosted payment page is opened in the browser with the
token returned by `POST /api/create-transaction`.

## Order lifecycle

`created` → `pending` → `settled` | `capture_accepted` | `denied` | `cancelled` | `expired`

Midtrans delivers the authoritative outcome to `POST /api/notification`.
Notifications are signature-checked and idempotent: replays never change an
order twice.

## Error Handling

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Invalid product type. Choose: basic, colorful, or ultimate",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development")
    ),
    tags(
        (name = "Payments", description = "Checkout, provider notifications and status"),
        (name = "Orders", description = "Locally recorded orders"),
        (name = "Catalog", description = "Products for sale"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::transactions::create_transaction,
        crate::handlers::notifications::payment_notification,
        crate::handlers::status::transaction_status,
        crate::handlers::orders::get_order,
        crate::handlers::products::list_products,
        crate::handlers::health::health,
    ),
    components(
        schemas(
            crate::models::CheckoutRequest,
            crate::models::OrderStatus,
            crate::catalog::ProductCode,
            crate::services::transactions::CreatedTransaction,
            crate::handlers::notifications::NotificationAckBody,
            crate::handlers::status::TransactionStatusResponse,
            crate::handlers::orders::OrderView,
            crate::handlers::products::ProductView,
            crate::handlers::products::CatalogView,
            crate::handlers::health::HealthResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
