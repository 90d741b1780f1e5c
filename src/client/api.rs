use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::ClientError;
use crate::models::CheckoutRequest;
use crate::services::transactions::CreatedTransaction;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// A product as listed by `GET /api/products`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductListing {
    pub code: String,
    pub name: String,
    pub unit_price: i64,
    pub description: String,
    pub price_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Catalog {
    pub products: Vec<ProductListing>,
    pub midtrans_client_key: Option<String>,
    pub midtrans_mode: String,
}

/// Backend calls made by the storefront
#[async_trait]
pub trait TransactionApi: Send + Sync {
    async fn create_transaction(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CreatedTransaction, ClientError>;

    async fn fetch_catalog(&self) -> Result<Catalog, ClientError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct RejectionBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpTransactionApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransactionApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl TransactionApi for HttpTransactionApi {
    async fn create_transaction(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CreatedTransaction, ClientError> {
        let response = self
            .client
            .post(self.url("create-transaction"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<RejectionBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "Failed to create transaction".to_string());
            warn!(%status, %message, "Checkout rejected by backend");
            return Err(ClientError::TransactionRejected(message));
        }

        let created: CreatedTransaction = response.json().await?;
        if !created.success || created.token.is_empty() {
            return Err(ClientError::TransactionRejected(
                "Failed to create transaction".to_string(),
            ));
        }
        Ok(created)
    }

    async fn fetch_catalog(&self) -> Result<Catalog, ClientError> {
        let envelope: Envelope<Catalog> = self
            .client
            .get(self.url("products"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        envelope
            .data
            .ok_or_else(|| ClientError::Http("product listing had no data".to_string()))
    }
}
