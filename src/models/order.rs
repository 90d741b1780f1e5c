use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::catalog::ProductCode;
use crate::models::Customer;

/// Lifecycle of a checkout as seen by the store.
///
/// `Created` is set when the provider has issued a payment token. `Pending`
/// waits for the shopper to pay; every other state is terminal, except that a
/// captured card payment may still settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Pending,
    CaptureAccepted,
    Settled,
    Denied,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Pending => "pending",
            OrderStatus::CaptureAccepted => "capture_accepted",
            OrderStatus::Settled => "settled",
            OrderStatus::Denied => "denied",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Created | OrderStatus::Pending)
    }

    /// Money has been taken (captured or settled).
    pub fn is_paid(&self) -> bool {
        matches!(self, OrderStatus::CaptureAccepted | OrderStatus::Settled)
    }

    /// Whether a provider event may move an order from `self` to `next`.
    ///
    /// Duplicates and regressions are refused so replayed webhooks are no-ops.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (current, next) if *current == next => false,
            (_, OrderStatus::Created) => false,
            (OrderStatus::Created, _) => true,
            (OrderStatus::Pending, next) => next.is_terminal(),
            (OrderStatus::CaptureAccepted, OrderStatus::Settled) => true,
            _ => false,
        }
    }

    /// Maps a provider `transaction_status` / `fraud_status` pair onto the
    /// store's status taxonomy.
    pub fn from_provider(transaction_status: &str, fraud_status: Option<&str>) -> StatusMapping {
        match transaction_status {
            "capture" => match fraud_status {
                Some("accept") => StatusMapping::Apply(OrderStatus::CaptureAccepted),
                _ => StatusMapping::HeldForReview,
            },
            "settlement" => StatusMapping::Apply(OrderStatus::Settled),
            "pending" => StatusMapping::Apply(OrderStatus::Pending),
            "deny" => StatusMapping::Apply(OrderStatus::Denied),
            "cancel" => StatusMapping::Apply(OrderStatus::Cancelled),
            "expire" => StatusMapping::Apply(OrderStatus::Expired),
            _ => StatusMapping::Unmapped,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "pending" => Ok(OrderStatus::Pending),
            "capture_accepted" => Ok(OrderStatus::CaptureAccepted),
            "settled" => Ok(OrderStatus::Settled),
            "denied" => Ok(OrderStatus::Denied),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "expired" => Ok(OrderStatus::Expired),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

/// Outcome of mapping a provider status pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMapping {
    Apply(OrderStatus),
    /// Captured but not fraud-accepted; left for manual review.
    HeldForReview,
    /// Provider status the store does not act on.
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub order_id: String,
    pub product_code: ProductCode,
    pub quantity: u32,
    /// `unit_price * quantity`, in Rupiah
    pub gross_amount: i64,
    pub customer: Customer,
    pub status: OrderStatus,
    #[serde(skip_serializing)]
    pub provider_token: Option<String>,
    pub redirect_url: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub payment_type: Option<String>,
    /// Raw `transaction_status` of the last provider event applied to this order
    pub last_provider_status: Option<String>,
    /// Set when a reconcile pass left the order unchanged; the sweep skips it until then
    #[serde(default)]
    pub next_reconcile_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Order {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Past its payment window and not deferred by an earlier reconcile pass.
    pub fn is_due_for_reconcile(&self, now: DateTime<Utc>) -> bool {
        self.is_expired_at(now) && self.next_reconcile_at.map_or(true, |at| at <= now)
    }
}
