use metrics::counter;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    errors::ServiceError,
    provider::PaymentProvider,
    services::order_status::{ApplyOutcome, OrderStatusApplier},
};

/// What happened to an authenticated notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAck {
    Processed(ApplyOutcome),
    /// Authenticated but could not be applied; logged, still acknowledged
    Failed,
}

#[derive(Clone)]
pub struct NotificationService {
    provider: Arc<dyn PaymentProvider>,
    applier: OrderStatusApplier,
}

impl NotificationService {
    pub fn new(provider: Arc<dyn PaymentProvider>, applier: OrderStatusApplier) -> Self {
        Self { provider, applier }
    }

    /// Authenticates a raw webhook body and applies it.
    ///
    /// Errors are returned only for bodies that are not a notification
    /// (`MalformedNotification`) or fail signature verification. Once
    /// authenticated, the provider is always acknowledged so it stops
    /// retrying; internal failures are logged under the
    /// `notification_failure` target.
    pub async fn handle(&self, body: &[u8]) -> Result<NotificationAck, ServiceError> {
        let payload: Value = serde_json::from_slice(body).map_err(|e| {
            counter!("mochi.notifications.rejected", 1);
            ServiceError::MalformedNotification(format!("invalid notification body: {}", e))
        })?;

        let report = self.provider.verify_notification(&payload).map_err(|e| {
            counter!("mochi.notifications.rejected", 1);
            warn!(error = %e, "notification rejected");
            match e {
                ServiceError::BadRequest(detail) => ServiceError::MalformedNotification(detail),
                other => other,
            }
        })?;

        info!(
            order_id = %report.order_id,
            transaction_status = %report.transaction_status,
            fraud_status = ?report.fraud_status,
            "payment notification received"
        );

        match self.applier.apply(&report).await {
            Ok(outcome) => {
                if outcome.is_applied() {
                    counter!("mochi.notifications.applied", 1);
                } else {
                    counter!("mochi.notifications.ignored", 1);
                    info!(
                        order_id = %report.order_id,
                        outcome = outcome.label(),
                        "notification acknowledged without change"
                    );
                }
                Ok(NotificationAck::Processed(outcome))
            }
            Err(e) => {
                error!(
                    target: "notification_failure",
                    order_id = %report.order_id,
                    transaction_status = %report.transaction_status,
                    error = %e,
                    "failed to apply authenticated notification"
                );
                Ok(NotificationAck::Failed)
            }
        }
    }
}
