//! Dasai Mochi store backend
//!
//! Checkout, Midtrans payment notifications and status queries for the three
//! Dasai Mochi variants, plus the client-side payment orchestrator that drives
//! the hosted Snap popup.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod catalog;
pub mod client;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod order_id;
pub mod provider;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
};
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub services: handlers::AppServices,
    /// `sandbox` or `production`
    pub provider_mode: &'static str,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Routes under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/create-transaction",
            post(handlers::transactions::create_transaction),
        )
        .route(
            "/notification",
            post(handlers::notifications::payment_notification),
        )
        .route(
            "/transaction/:order_id",
            get(handlers::status::transaction_status),
        )
        .route("/orders/:order_id", get(handlers::orders::get_order))
        .route("/products", get(handlers::products::list_products))
        .route("/health", get(handlers::health::health))
}

/// CORS for the storefront origin
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origin = cfg.frontend_url.trim_end_matches('/');
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static(middleware_helpers::request_id::REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(
            middleware_helpers::request_id::REQUEST_ID_HEADER,
        )])
        .allow_credentials(cfg.cors_allow_credentials);

    match HeaderValue::from_str(origin) {
        // Only echoed back when the request origin matches
        Ok(value) => layer.allow_origin(AllowOrigin::list([value])),
        Err(_) => {
            ::tracing::warn!(origin, "frontend_url is not a valid origin header; CORS disabled");
            layer
        }
    }
}

/// Full application router with middleware
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.config.provider_timeout() * 2 + Duration::from_secs(5);
    let cors = cors_layer(&state.config);

    Router::<AppState>::new()
        .route("/", get(|| async { "dasai-mochi-api up" }))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
