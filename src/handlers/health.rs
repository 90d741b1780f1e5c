use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::handlers::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "OK")]
    pub status: String,
    pub timestamp: String,
    #[schema(example = "development")]
    pub environment: String,
    #[schema(example = "sandbox")]
    pub midtrans_mode: String,
    pub version: String,
}

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        environment: state.config.environment.clone(),
        midtrans_mode: state.provider_mode.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
