use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::signature::verify_signature;
use super::{PaymentProvider, SnapToken, SnapTransactionRequest, TransactionReport};
use crate::errors::ServiceError;

pub const SANDBOX_SNAP_BASE_URL: &str = "https://app.sandbox.midtrans.com";
pub const PRODUCTION_SNAP_BASE_URL: &str = "https://app.midtrans.com";
pub const SANDBOX_API_BASE_URL: &str = "https://api.sandbox.midtrans.com";
pub const PRODUCTION_API_BASE_URL: &str = "https://api.midtrans.com";

#[derive(Debug, Clone)]
pub struct MidtransConfig {
    pub server_key: String,
    pub is_production: bool,
    pub snap_base_url: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl MidtransConfig {
    /// Endpoints for the given mode, with default timeout.
    pub fn new(server_key: impl Into<String>, is_production: bool) -> Self {
        let (snap, api) = if is_production {
            (PRODUCTION_SNAP_BASE_URL, PRODUCTION_API_BASE_URL)
        } else {
            (SANDBOX_SNAP_BASE_URL, SANDBOX_API_BASE_URL)
        };
        Self {
            server_key: server_key.into(),
            is_production,
            snap_base_url: snap.to_string(),
            api_base_url: api.to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Midtrans Snap (token issuance) and Core API (status) client
#[derive(Clone)]
pub struct MidtransClient {
    client: reqwest::Client,
    config: MidtransConfig,
}

impl std::fmt::Debug for MidtransClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidtransClient")
            .field("is_production", &self.config.is_production)
            .field("snap_base_url", &self.config.snap_base_url)
            .field("api_base_url", &self.config.api_base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SnapErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
}

impl MidtransClient {
    pub fn new(config: MidtransConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, base: &str, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = Url::parse(base)
            .map_err(|e| ServiceError::InternalError(format!("invalid base url {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::InternalError(format!("base url {} cannot have paths", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn transport_error(e: reqwest::Error, wrap: fn(String) -> ServiceError) -> ServiceError {
    if e.is_timeout() {
        ServiceError::ProviderTimeout(e.to_string())
    } else {
        wrap(e.to_string())
    }
}

#[async_trait]
impl PaymentProvider for MidtransClient {
    #[instrument(skip(self, request), fields(order_id = %request.transaction_details.order_id))]
    async fn create_transaction(
        &self,
        request: &SnapTransactionRequest,
    ) -> Result<SnapToken, ServiceError> {
        let url = self.endpoint(&self.config.snap_base_url, &["snap", "v1", "transactions"])?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.server_key, Some(""))
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, ServiceError::ProviderError))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<SnapToken>()
                .await
                .map_err(|e| ServiceError::ProviderError(format!("unreadable snap response: {}", e)));
        }

        let detail = response
            .json::<SnapErrorBody>()
            .await
            .map(|body| body.error_messages.join("; "))
            .unwrap_or_default();
        warn!(http_status = %status, detail = %detail, "snap rejected transaction");
        Err(ServiceError::ProviderError(format!(
            "snap returned {}: {}",
            status, detail
        )))
    }

    #[instrument(skip(self))]
    async fn transaction_status(&self, order_id: &str) -> Result<Option<Value>, ServiceError> {
        let url = self.endpoint(&self.config.api_base_url, &["v2", order_id, "status"])?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.server_key, Some(""))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(e, ServiceError::StatusQueryFailed))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ServiceError::StatusQueryFailed(format!(
                "status endpoint returned {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::StatusQueryFailed(format!("unreadable status body: {}", e)))?;

        // Core API answers unknown orders with HTTP 200 and an embedded 404
        match body.get("status_code").and_then(Value::as_str) {
            Some("404") => {
                debug!(order_id, "provider has no record of order");
                Ok(None)
            }
            Some(code) if !code.starts_with('2') && !code.starts_with('4') => {
                Err(ServiceError::StatusQueryFailed(format!(
                    "provider status_code {}",
                    code
                )))
            }
            _ => Ok(Some(body)),
        }
    }

    fn verify_notification(&self, payload: &Value) -> Result<TransactionReport, ServiceError> {
        let report = TransactionReport::from_value(payload)?;

        let (Some(status_code), Some(gross_amount), Some(signature)) = (
            report.status_code.as_deref(),
            report.gross_amount.as_deref(),
            report.signature_key.as_deref(),
        ) else {
            return Err(ServiceError::UnauthenticatedNotification(
                "signature fields missing".to_string(),
            ));
        };

        if !verify_signature(
            &report.order_id,
            status_code,
            gross_amount,
            &self.config.server_key,
            signature,
        ) {
            return Err(ServiceError::UnauthenticatedNotification(format!(
                "bad signature for order {}",
                report.order_id
            )));
        }

        Ok(report)
    }

    fn mode(&self) -> &'static str {
        if self.config.is_production {
            "production"
        } else {
            "sandbox"
        }
    }
}
