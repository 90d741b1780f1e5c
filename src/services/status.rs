use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{
    errors::ServiceError,
    models::Order,
    provider::{PaymentProvider, TransactionReport},
    repositories::OrderRepository,
    services::{order_status::OrderStatusApplier, with_provider_timeout},
};

/// Read-through to the provider's transaction status, plus local order lookup.
#[derive(Clone)]
pub struct StatusQueryService {
    provider: Arc<dyn PaymentProvider>,
    repo: Arc<dyn OrderRepository>,
    applier: OrderStatusApplier,
    provider_timeout: Duration,
}

impl StatusQueryService {
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

    /// Provider snapshot for `order_id`, returned unchanged.
    ///
    /// The local order is reconciled from the snapshot on a best-effort basis;
    /// reconciliation problems never fail the query.
    #[instrument(skip(self))]
    pub async fn get_status(&self, order_id: &str) -> Result<Value, ServiceError> {
        let snapshot = with_provider_timeout(
            self.provider_timeout,
            "transaction status query",
            self.provider.transaction_status(order_id),
        )
        .await
        .map_err(|e| match e {
            ServiceError::ProviderTimeout(_) | ServiceError::StatusQueryFailed(_) => e,
            other => ServiceError::StatusQueryFailed(other.to_string()),
        })?
        .ok_or_else(|| {
            ServiceError::StatusQueryFailed(format!("provider has no transaction {}", order_id))
        })?;

        match TransactionReport::from_value(&snapshot) {
            Ok(report) => match self.applier.apply(&report).await {
                Ok(outcome) => debug!(order_id, outcome = outcome.label(), "reconciled from status"),
                Err(e) => warn!(order_id, error = %e, "could not reconcile order from status"),
            },
            Err(e) => debug!(order_id, error = %e, "status snapshot not reconcilable"),
        }

        Ok(snapshot)
    }

    pub async fn find_order(&self, order_id: &str) -> Result<Order, ServiceError> {
        self.repo
            .find(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }
}
