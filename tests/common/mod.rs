#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use dasai_mochi_api::{
    catalog::ProductCode,
    config::AppConfig,
    errors::ServiceError,
    events::{Event, EventSender},
    handlers::AppServices,
    models::{Customer, Order, OrderStatus},
    provider::{
        signature::{notification_signature, verify_signature},
        PaymentProvider, SnapToken, SnapTransactionRequest, TransactionReport,
    },
    repositories::{InMemoryOrderRepository, OrderRepository},
    AppState,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const SERVER_KEY: &str = "SB-Mid-server-integration";

/// In-process stand-in for Midtrans that records every call.
#[derive(Default)]
pub struct FakeProvider {
    created: Mutex<Vec<SnapTransactionRequest>>,
    statuses: Mutex<HashMap<String, Value>>,
    status_queries: AtomicUsize,
    delay: Option<Duration>,
    reject_create: bool,
    failing_status: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_create: true,
            ..Self::default()
        }
    }

    pub fn with_failing_status() -> Self {
        Self {
            failing_status: true,
            ..Self::default()
        }
    }

    pub fn set_status(&self, order_id: &str, snapshot: Value) {
        self.statuses
            .lock()
            .unwrap()
            .insert(order_id.to_string(), snapshot);
    }

    pub fn created_requests(&self) -> Vec<SnapTransactionRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_transaction(
        &self,
        request: &SnapTransactionRequest,
    ) -> Result<SnapToken, ServiceError> {
        self.pause().await;
        self.created.lock().unwrap().push(request.clone());
        if self.reject_create {
            return Err(ServiceError::ProviderError(
                "transaction_details.gross_amount is not equal to the sum of item_details".into(),
            ));
        }
        let n = self.created.lock().unwrap().len();
        let token = format!("tok-{}", n);
        Ok(SnapToken {
            redirect_url: format!("https://app.sandbox.midtrans.com/snap/v4/redirection/{}", token),
            token,
        })
    }

    async fn transaction_status(&self, order_id: &str) -> Result<Option<Value>, ServiceError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.failing_status {
            return Err(ServiceError::StatusQueryFailed(
                "status endpoint returned 503".into(),
            ));
        }
        Ok(self.statuses.lock().unwrap().get(order_id).cloned())
    }

    fn verify_notification(&self, payload: &Value) -> Result<TransactionReport, ServiceError> {
        let report = TransactionReport::from_value(payload)?;
        let (Some(code), Some(amount), Some(signature)) = (
            report.status_code.as_deref(),
            report.gross_amount.as_deref(),
            report.signature_key.as_deref(),
        ) else {
            return Err(ServiceError::UnauthenticatedNotification(
                "signature fields missing".into(),
            ));
        };
        if !verify_signature(&report.order_id, code, amount, SERVER_KEY, signature) {
            return Err(ServiceError::UnauthenticatedNotification(
                "bad signature".into(),
            ));
        }
        Ok(report)
    }

    fn mode(&self) -> &'static str {
        "sandbox"
    }
}

/// A Midtrans webhook body signed with [`SERVER_KEY`].
pub fn signed_notification(
    order_id: &str,
    transaction_status: &str,
    fraud_status: Option<&str>,
) -> Value {
    let status_code = if transaction_status == "pending" {
        "201"
    } else {
        "200"
    };
    let gross_amount = "150000.00";
    let mut body = json!({
        "order_id": order_id,
        "transaction_status": transaction_status,
        "status_code": status_code,
        "gross_amount": gross_amount,
        "transaction_id": "b6e1f3b0-0c5e-4a55-9a67-3b8f0e0a1c11",
        "payment_type": "bank_transfer",
        "transaction_time": "2024-06-10 10:00:00",
        "signature_key": notification_signature(order_id, status_code, gross_amount, SERVER_KEY),
    });
    if let Some(fraud) = fraud_status {
        body["fraud_status"] = json!(fraud);
    }
    body
}

/// A `Basic` order for Ana whose payment window closed `minutes_ago` minutes ago
/// (negative values leave it open).
pub fn stored_order(order_id: &str, status: OrderStatus, minutes_ago: i64) -> Order {
    let now = Utc::now();
    Order {
        order_id: order_id.to_string(),
        product_code: ProductCode::Basic,
        quantity: 1,
        gross_amount: 150_000,
        customer: Customer {
            name: "Ana".into(),
            email: "ana@x.com".into(),
            phone: "081234567890".into(),
        },
        status,
        provider_token: Some("tok-seed".into()),
        redirect_url: None,
        provider_transaction_id: None,
        payment_type: None,
        last_provider_status: None,
        next_reconcile_at: None,
        created_at: now - ChronoDuration::minutes(60 + minutes_ago),
        updated_at: now - ChronoDuration::minutes(60 + minutes_ago),
        expires_at: now - ChronoDuration::minutes(minutes_ago),
    }
}

pub fn checkout_body(product: &str, phone: &str) -> Value {
    json!({
        "product_type": product,
        "quantity": 1,
        "customer_name": "Ana",
        "customer_email": "ana@x.com",
        "customer_phone": phone,
    })
}

/// Full router over an in-memory order store and a [`FakeProvider`].
pub struct TestApp {
    router: Router,
    pub repo: Arc<InMemoryOrderRepository>,
    pub provider: Arc<FakeProvider>,
    pub services: AppServices,
    events: Mutex<mpsc::Receiver<Event>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(FakeProvider::new())
    }

    pub fn with_provider(provider: FakeProvider) -> Self {
        let mut cfg = AppConfig::new(SERVER_KEY.to_string(), "test".to_string());
        cfg.provider_timeout_secs = 2;
        cfg.midtrans_client_key = Some("SB-Mid-client-integration".to_string());
        Self::with_config(cfg, provider)
    }

    pub fn with_config(cfg: AppConfig, provider: FakeProvider) -> Self {
        let provider = Arc::new(provider);
        let repo = Arc::new(InMemoryOrderRepository::new());
        let (tx, rx) = mpsc::channel(256);

        let services = AppServices::new(&cfg, provider.clone(), repo.clone(), EventSender::new(tx));
        let state = AppState {
            config: Arc::new(cfg),
            services: services.clone(),
            provider_mode: provider.mode(),
        };

        Self {
            router: dasai_mochi_api::build_router(state),
            repo,
            provider,
            services,
            events: Mutex::new(rx),
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("build request")).await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn order_count(&self) -> usize {
        self.repo.len()
    }

    pub async fn seed(&self, order: Order) {
        self.repo.insert(&order).await.expect("seed order");
    }

    pub async fn stored_status(&self, order_id: &str) -> Option<String> {
        self.repo
            .find(order_id)
            .await
            .expect("repository lookup")
            .map(|order| order.status.as_str().to_string())
    }

    /// Events emitted so far, in order
    pub fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().unwrap();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }
}

pub async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, value)
}
