use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    errors::ServiceError,
    provider::{PaymentProvider, TransactionReport},
    repositories::OrderRepository,
    services::{order_status::OrderStatusApplier, with_provider_timeout},
};

const BATCH_SIZE: u64 = 100;
const CONCURRENT_CHECKS: usize = 4;
/// How long an order left unchanged by a pass stays out of the sweep
pub const RECHECK_AFTER_MINUTES: i64 = 30;

enum CheckOutcome {
    Updated,
    Expired,
    Unchanged,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub updated: usize,
    pub expired: usize,
    pub failed: usize,
}

/// Re-checks orders whose payment window closed without a final webhook.
#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn PaymentProvider>,
    repo: Arc<dyn OrderRepository>,
    applier: OrderStatusApplier,
    provider_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        repo: Arc<dyn OrderRepository>,
        applier: OrderStatusApplier,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            repo,
            applier,
            provider_timeout,
        }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ReconcileSummary, ServiceError> {
        let due = self
            .repo
            .find_unsettled_expired_before(now, BATCH_SIZE)
            .await?;

        let outcomes: Vec<CheckOutcome> = stream::iter(due)
            .map(|order| async move { self.check(&order.order_id, now).await })
            .buffer_unordered(CONCURRENT_CHECKS)
            .collect()
            .await;

        let mut summary = ReconcileSummary::default();
        for outcome in outcomes {
            summary.checked += 1;
            match outcome {
                CheckOutcome::Expired => {
                    summary.expired += 1;
                    summary.updated += 1;
                }
                CheckOutcome::Updated => summary.updated += 1,
                CheckOutcome::Unchanged => {}
                CheckOutcome::Failed => summary.failed += 1,
            }
        }

        if summary.checked > 0 {
            info!(
                checked = summary.checked,
                updated = summary.updated,
                expired = summary.expired,
                failed = summary.failed,
                "reconcile pass finished"
            );
        }
        Ok(summary)
    }

    async fn check(&self, order_id: &str, now: DateTime<Utc>) -> CheckOutcome {
        let status = with_provider_timeout(
            self.provider_timeout,
            "reconcile status query",
            self.provider.transaction_status(order_id),
        )
        .await;

        let result = match status {
            Ok(Some(snapshot)) => match TransactionReport::from_value(&snapshot) {
                Ok(report) => self.applier.apply(&report).await.map(|o| (o, false)),
                Err(e) => Err(e),
            },
            // Provider never saw a payment attempt for this order
            Ok(None) => self.applier.expire(order_id).await.map(|o| (o, true)),
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok((outcome, true)) if outcome.is_applied() => CheckOutcome::Expired,
            Ok((outcome, _)) if outcome.is_applied() => CheckOutcome::Updated,
            Ok(_) => CheckOutcome::Unchanged,
            Err(e) => {
                warn!(order_id, error = %e, "reconcile failed for order");
                CheckOutcome::Failed
            }
        };

        // Not moved by this pass; keep it out of the next sweeps
        if matches!(outcome, CheckOutcome::Unchanged | CheckOutcome::Failed) {
            let until = now + ChronoDuration::minutes(RECHECK_AFTER_MINUTES);
            if let Err(e) = self.repo.defer_reconcile(order_id, until).await {
                warn!(order_id, error = %e, "could not defer reconcile");
            }
        }
        outcome
    }

    /// Runs [`Reconciler::run_once`] every `interval` until the task is aborted.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once(Utc::now()).await {
                    warn!(error = %e, "reconcile pass failed");
                }
            }
        })
    }
}
