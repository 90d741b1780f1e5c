use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use url::Url;
use utoipa::ToSchema;

use crate::{
    catalog::{self, format_rupiah},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{CheckoutRequest, Order, OrderStatus, ValidCheckout},
    order_id::OrderIdGenerator,
    provider::{
        Callbacks, CustomerDetails, Expiry, ItemDetail, PaymentProvider, SnapTransactionRequest,
        TransactionDetails,
    },
    repositories::OrderRepository,
    services::with_provider_timeout,
};

/// Midtrans renders expiry start times in Western Indonesia Time
const PROVIDER_UTC_OFFSET_HOURS: i64 = 7;

#[derive(Debug, Clone)]
pub struct TransactionSettings {
    /// Base for the finish/unfinish/error redirects
    pub frontend_url: String,
    pub expiry_minutes: u32,
    pub provider_timeout: Duration,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            expiry_minutes: 60,
            provider_timeout: Duration::from_secs(15),
        }
    }
}

/// Successful `POST /api/create-transaction` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedTransaction {
    pub success: bool,
    pub token: String,
    pub redirect_url: String,
    pub order_id: String,
    /// Gross amount in Rupiah
    pub amount: i64,
}

#[derive(Clone)]
pub struct TransactionService {
    provider: Arc<dyn PaymentProvider>,
    repo: Arc<dyn OrderRepository>,
    order_ids: OrderIdGenerator,
    events: EventSender,
    settings: TransactionSettings,
}

impl TransactionService {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        repo: Arc<dyn OrderRepository>,
        order_ids: OrderIdGenerator,
        events: EventSender,
        settings: TransactionSettings,
    ) -> Self {
        Self {
            provider,
            repo,
            order_ids,
            events,
            settings,
        }
    }

    /// Validates the checkout, obtains a Snap token and records the order.
    ///
    /// The order row is written only after the provider issued a token, in a
    /// single insert, so a provider failure leaves nothing behind.
    #[instrument(skip(self, request), fields(product = ?request.product_type))]
    pub async fn create_transaction(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CreatedTransaction, ServiceError> {
        let checkout = request.validate().map_err(|e| {
            warn!(error = %e, "checkout rejected");
            e
        })?;

        let order_id = self.order_ids.generate();
        let now = Utc::now();
        let snap_request = build_snap_request(&checkout, &order_id, now, &self.settings)?;

        let token = with_provider_timeout(
            self.settings.provider_timeout,
            "snap token request",
            self.provider.create_transaction(&snap_request),
        )
        .await
        .map_err(|e| {
            counter!("mochi.transactions.failed", 1);
            error!(order_id = %order_id, error = %e, "provider refused transaction");
            e
        })?;

        let order = Order {
            order_id: order_id.clone(),
            product_code: checkout.product.code,
            quantity: checkout.quantity,
            gross_amount: checkout.gross_amount,
            customer: checkout.customer.clone(),
            status: OrderStatus::Created,
            provider_token: Some(token.token.clone()),
            redirect_url: Some(token.redirect_url.clone()),
            provider_transaction_id: None,
            payment_type: None,
            last_provider_status: None,
            next_reconcile_at: None,
            created_at: now,
            updated_at: now,
            expires_at: now + ChronoDuration::minutes(i64::from(self.settings.expiry_minutes)),
        };

        if let Err(e) = self.repo.insert(&order).await {
            counter!("mochi.transactions.failed", 1);
            error!(order_id = %order_id, error = %e, "token issued but order could not be stored");
            return Err(e);
        }

        counter!("mochi.transactions.created", 1);
        info!(
            order_id = %order_id,
            amount = %format_rupiah(order.gross_amount),
            "transaction created"
        );
        self.events
            .send_or_log(Event::OrderCreated {
                order_id: order_id.clone(),
                gross_amount: order.gross_amount,
            })
            .await;

        Ok(CreatedTransaction {
            success: true,
            token: token.token,
            redirect_url: token.redirect_url,
            order_id,
            amount: order.gross_amount,
        })
    }
}

/// Expiry start time in the provider's local time, e.g. `2024-12-09 17:30:00 +0700`.
pub fn provider_start_time(now: DateTime<Utc>) -> String {
    let local = now.naive_utc() + ChronoDuration::hours(PROVIDER_UTC_OFFSET_HOURS);
    format!(
        "{} +{:02}00",
        local.format("%Y-%m-%d %H:%M:%S"),
        PROVIDER_UTC_OFFSET_HOURS
    )
}

/// `{frontend_url}?order_id=..&status=..`
pub fn callback_url(frontend_url: &str, order_id: &str, outcome: &str) -> Result<String, ServiceError> {
    let mut url = Url::parse(frontend_url).map_err(|e| {
        ServiceError::InternalError(format!("invalid frontend url {}: {}", frontend_url, e))
    })?;
    url.query_pairs_mut()
        .append_pair("order_id", order_id)
        .append_pair("status", outcome);
    Ok(url.into())
}

pub fn build_snap_request(
    checkout: &ValidCheckout,
    order_id: &str,
    now: DateTime<Utc>,
    settings: &TransactionSettings,
) -> Result<SnapTransactionRequest, ServiceError> {
    let product = checkout.product;
    Ok(SnapTransactionRequest {
        transaction_details: TransactionDetails {
            order_id: order_id.to_string(),
            gross_amount: checkout.gross_amount,
        },
        item_details: vec![ItemDetail {
            id: product.code.as_str().to_string(),
            name: product.display_name.to_string(),
            price: product.unit_price,
            quantity: checkout.quantity,
            category: catalog::ITEM_CATEGORY.to_string(),
            merchant_name: catalog::MERCHANT_NAME.to_string(),
        }],
        customer_details: CustomerDetails {
            first_name: checkout.customer.name.clone(),
            email: checkout.customer.email.clone(),
            phone: checkout.customer.phone.clone(),
        },
        callbacks: Callbacks {
            finish: callback_url(&settings.frontend_url, order_id, "finish")?,
            unfinish: callback_url(&settings.frontend_url, order_id, "unfinish")?,
            error: callback_url(&settings.frontend_url, order_id, "error")?,
        },
        expiry: Expiry {
            start_time: provider_start_time(now),
            unit: "minute".to_string(),
            duration: settings.expiry_minutes,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn checkout() -> ValidCheckout {
        CheckoutRequest {
            product_type: Some("colorful".into()),
            quantity: Some(2),
            customer_name: Some("Ana".into()),
            customer_email: Some("ana@x.com".into()),
            customer_phone: Some("081234567890".into()),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn start_time_is_rendered_in_wib() {
        let now = Utc.with_ymd_and_hms(2024, 12, 9, 20, 15, 0).unwrap();
        assert_eq!(provider_start_time(now), "2024-12-10 03:15:00 +0700");
    }

    #[test]
    fn callbacks_carry_order_and_outcome() {
        let url = callback_url("http://localhost:5173", "MOCHI-1-ABC", "unfinish").unwrap();
        assert_eq!(url, "http://localhost:5173/?order_id=MOCHI-1-ABC&status=unfinish");
        assert!(callback_url("not a url", "MOCHI-1", "finish").is_err());
    }

    #[test]
    fn snap_request_describes_the_checkout() {
        let now = Utc.with_ymd_and_hms(2024, 12, 9, 3, 0, 0).unwrap();
        let request =
            build_snap_request(&checkout(), "MOCHI-1", now, &TransactionSettings::default())
                .unwrap();

        assert_eq!(request.transaction_details.gross_amount, 360_000);
        assert_eq!(request.item_details.len(), 1);
        let item = &request.item_details[0];
        assert_eq!(item.id, "colorful");
        assert_eq!(item.price * i64::from(item.quantity), 360_000);
        assert_eq!(item.category, "Robot Dashboard");
        assert_eq!(item.merchant_name, "Dasai Mochi Store");
        assert_eq!(request.customer_details.first_name, "Ana");
        assert!(request.callbacks.finish.ends_with("status=finish"));
        assert!(request.callbacks.error.contains("order_id=MOCHI-1"));
        assert_eq!(request.expiry.start_time, "2024-12-09 10:00:00 +0700");
        assert_eq!(request.expiry.duration, 60);
    }
}
