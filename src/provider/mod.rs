//! Payment provider seam.
//!
//! The store talks to Midtrans through [`PaymentProvider`]; services never see
//! HTTP details. Tests substitute an in-process fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

pub mod midtrans;
pub mod signature;

pub use midtrans::{MidtransClient, MidtransConfig};

/// Snap `POST /snap/v1/transactions` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapTransactionRequest {
    pub transaction_details: TransactionDetails,
    pub item_details: Vec<ItemDetail>,
    pub customer_details: CustomerDetails,
    pub callbacks: Callbacks,
    pub expiry: Expiry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub quantity: u32,
    pub category: String,
    pub merchant_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callbacks {
    pub finish: String,
    pub unfinish: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    /// `yyyy-MM-dd HH:mm:ss +0700`
    pub start_time: String,
    pub unit: String,
    pub duration: u32,
}

/// Token issued by Snap for the hosted payment page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapToken {
    pub token: String,
    pub redirect_url: String,
}

/// A provider report about one transaction, from a webhook or a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReport {
    pub order_id: String,
    pub transaction_status: String,
    pub fraud_status: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_type: Option<String>,
    pub status_code: Option<String>,
    pub gross_amount: Option<String>,
    pub signature_key: Option<String>,
}

/// Reads a field that Midtrans may send either as a string or as a number.
fn text_field(payload: &Value, name: &str) -> Option<String> {
    match payload.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl TransactionReport {
    pub fn from_value(payload: &Value) -> Result<Self, ServiceError> {
        if !payload.is_object() {
            return Err(ServiceError::BadRequest(
                "notification payload must be a JSON object".to_string(),
            ));
        }
        let order_id = text_field(payload, "order_id")
            .ok_or_else(|| ServiceError::BadRequest("order_id is missing".to_string()))?;
        let transaction_status = text_field(payload, "transaction_status").ok_or_else(|| {
            ServiceError::BadRequest("transaction_status is missing".to_string())
        })?;

        Ok(Self {
            order_id,
            transaction_status,
            fraud_status: text_field(payload, "fraud_status"),
            transaction_id: text_field(payload, "transaction_id"),
            payment_type: text_field(payload, "payment_type"),
            status_code: text_field(payload, "status_code"),
            gross_amount: text_field(payload, "gross_amount"),
            signature_key: text_field(payload, "signature_key"),
        })
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Requests a Snap token for a new transaction.
    async fn create_transaction(
        &self,
        request: &SnapTransactionRequest,
    ) -> Result<SnapToken, ServiceError>;

    /// Current provider view of a transaction; `None` when the provider has
    /// no record of the order.
    async fn transaction_status(&self, order_id: &str) -> Result<Option<Value>, ServiceError>;

    /// Authenticates a raw webhook payload and extracts its report.
    fn verify_notification(&self, payload: &Value) -> Result<TransactionReport, ServiceError>;

    /// `sandbox` or `production`
    fn mode(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_accepts_numeric_amounts_and_codes() {
        let report = TransactionReport::from_value(&json!({
            "order_id": "MOCHI-1",
            "transaction_status": "settlement",
            "status_code": 200,
            "gross_amount": 150000,
            "fraud_status": "",
        }))
        .unwrap();
        assert_eq!(report.status_code.as_deref(), Some("200"));
        assert_eq!(report.gross_amount.as_deref(), Some("150000"));
        assert_eq!(report.fraud_status, None);
    }

    #[test]
    fn report_requires_order_and_status() {
        assert!(matches!(
            TransactionReport::from_value(&json!({"transaction_status": "pending"})),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            TransactionReport::from_value(&json!({"order_id": "MOCHI-1"})),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            TransactionReport::from_value(&json!(["not", "an", "object"])),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn snap_request_serialises_with_provider_field_names() {
        let request = SnapTransactionRequest {
            transaction_details: TransactionDetails {
                order_id: "MOCHI-1".into(),
                gross_amount: 150_000,
            },
            item_details: vec![],
            customer_details: CustomerDetails {
                first_name: "Ana".into(),
                email: "ana@x.com".into(),
                phone: "081234567890".into(),
            },
            callbacks: Callbacks {
                finish: "f".into(),
                unfinish: "u".into(),
                error: "e".into(),
            },
            expiry: Expiry {
                start_time: "2024-12-09 17:30:00 +0700".into(),
                unit: "minute".into(),
                duration: 60,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["transaction_details"]["gross_amount"], 150_000);
        assert_eq!(value["customer_details"]["first_name"], "Ana");
        assert_eq!(value["expiry"]["unit"], "minute");
    }
}
