use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    catalog::{self, Product, ProductCode},
    handlers::AppState,
    ApiResponse,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductView {
    pub code: ProductCode,
    pub name: String,
    /// Unit price in Rupiah
    pub unit_price: i64,
    pub description: String,
    #[schema(example = "Rp 150.000")]
    pub price_label: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            code: product.code,
            name: product.display_name.to_string(),
            unit_price: product.unit_price,
            description: product.description.to_string(),
            price_label: product.price_label(),
        }
    }
}

/// Catalog plus what the storefront needs to load Snap.js
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogView {
    pub products: Vec<ProductView>,
    pub midtrans_client_key: Option<String>,
    #[schema(example = "sandbox")]
    pub midtrans_mode: String,
}

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    responses((status = 200, description = "The three Dasai Mochi variants", body = CatalogView)),
    tag = "Catalog"
)]
pub async fn list_products(State(state): State<AppState>) -> Json<ApiResponse<CatalogView>> {
    Json(ApiResponse::success(CatalogView {
        products: catalog::products().iter().map(ProductView::from).collect(),
        midtrans_client_key: state.config.midtrans_client_key.clone(),
        midtrans_mode: state.provider_mode.to_string(),
    }))
}
