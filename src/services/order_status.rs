use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{OrderStatus, StatusMapping},
    provider::TransactionReport,
    repositories::OrderRepository,
    services::order_locks::KeyedLock,
};

/// Result of offering a provider report to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        from: OrderStatus,
        to: OrderStatus,
    },
    /// Order already in the reported state
    Duplicate,
    /// Capture without fraud acceptance
    HeldForReview,
    /// Provider status the store does not act on
    Unmapped,
    /// Report would move a settled or closed order backwards
    Stale {
        current: OrderStatus,
        reported: OrderStatus,
    },
    UnknownOrder,
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied { .. } => "applied",
            ApplyOutcome::Duplicate => "duplicate",
            ApplyOutcome::HeldForReview => "held_for_review",
            ApplyOutcome::Unmapped => "unmapped",
            ApplyOutcome::Stale { .. } => "stale",
            ApplyOutcome::UnknownOrder => "unknown_order",
        }
    }
}

/// Single writer for order status.
///
/// Webhooks, status queries and the reconciler all funnel through here. Each
/// update runs under the order's lock and only moves forward along
/// [`OrderStatus::can_transition_to`], so replays are no-ops and events fire
/// once per applied transition.
#[derive(Clone)]
pub struct OrderStatusApplier {
    repo: Arc<dyn OrderRepository>,
    locks: Arc<KeyedLock>,
    events: EventSender,
}

impl OrderStatusApplier {
    pub fn new(repo: Arc<dyn OrderRepository>, locks: Arc<KeyedLock>, events: EventSender) -> Self {
        Self {
            repo,
            locks,
            events,
        }
    }

    #[instrument(skip(self, report), fields(order_id = %report.order_id, transaction_status = %report.transaction_status))]
    pub async fn apply(&self, report: &TransactionReport) -> Result<ApplyOutcome, ServiceError> {
        let next = match OrderStatus::from_provider(
            &report.transaction_status,
            report.fraud_status.as_deref(),
        ) {
            StatusMapping::Apply(next) => next,
            StatusMapping::HeldForReview => {
                warn!(
                    fraud_status = ?report.fraud_status,
                    "capture held for manual review, order unchanged"
                );
                return Ok(ApplyOutcome::HeldForReview);
            }
            StatusMapping::Unmapped => {
                info!("unmapped provider status, order unchanged");
                return Ok(ApplyOutcome::Unmapped);
            }
        };

        self.transition(&report.order_id, next, Some(report)).await
    }

    /// Closes an order the provider never saw once its payment window passed.
    pub async fn expire(&self, order_id: &str) -> Result<ApplyOutcome, ServiceError> {
        self.transition(order_id, OrderStatus::Expired, None).await
    }

    async fn transition(
        &self,
        order_id: &str,
        next: OrderStatus,
        report: Option<&TransactionReport>,
    ) -> Result<ApplyOutcome, ServiceError> {
        let _guard = self.locks.lock(order_id).await;

        let Some(mut order) = self.repo.find(order_id).await? else {
            warn!(order_id, "provider reported an order this store does not know");
            return Ok(ApplyOutcome::UnknownOrder);
        };

        let current = order.status;
        if current == next {
            return Ok(ApplyOutcome::Duplicate);
        }
        if !current.can_transition_to(next) {
            info!(order_id, from = %current, to = %next, "ignoring stale provider status");
            return Ok(ApplyOutcome::Stale {
                current,
                reported: next,
            });
        }

        let now = Utc::now();
        order.status = next;
        order.updated_at = now;
        if let Some(report) = report {
            order.last_provider_status = Some(report.transaction_status.clone());
            if report.transaction_id.is_some() {
                order.provider_transaction_id = report.transaction_id.clone();
            }
            if report.payment_type.is_some() {
                order.payment_type = report.payment_type.clone();
            }
        }
        self.repo.update(&order).await?;

        info!(order_id, from = %current, to = %next, "order status updated");

        for event in Event::for_transition(order_id, order.gross_amount, current, next, now) {
            self.events.send_or_log(event).await;
        }

        Ok(ApplyOutcome::Applied {
            from: current,
            to: next,
        })
    }
}
