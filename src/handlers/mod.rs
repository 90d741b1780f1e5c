pub mod health;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod status;
pub mod transactions;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    events::EventSender,
    order_id::OrderIdGenerator,
    provider::PaymentProvider,
    repositories::OrderRepository,
    services::{
        notifications::NotificationService, order_locks::KeyedLock,
        order_status::OrderStatusApplier, reconcile::Reconciler, status::StatusQueryService,
        transactions::{TransactionService, TransactionSettings},
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub transactions: Arc<TransactionService>,
    pub notifications: Arc<NotificationService>,
    pub status: Arc<StatusQueryService>,
    pub reconciler: Reconciler,
}

impl AppServices {
    /// Wires every service around one provider, one order store and one
    /// per-order lock table.
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn PaymentProvider>,
        repo: Arc<dyn OrderRepository>,
        events: EventSender,
    ) -> Self {
        let applier = OrderStatusApplier::new(repo.clone(), Arc::new(KeyedLock::new()), events.clone());
        let settings = TransactionSettings {
            frontend_url: config.frontend_url.clone(),
            expiry_minutes: config.transaction_expiry_minutes,
            provider_timeout: config.provider_timeout(),
        };

        Self {
            transactions: Arc::new(TransactionService::new(
                provider.clone(),
                repo.clone(),
                OrderIdGenerator::new(config.order_id_prefix.clone()),
                events,
                settings,
            )),
            notifications: Arc::new(NotificationService::new(provider.clone(), applier.clone())),
            status: Arc::new(StatusQueryService::new(
                provider.clone(),
                repo.clone(),
                applier.clone(),
                config.provider_timeout(),
            )),
            reconciler: Reconciler::new(provider, repo, applier, config.provider_timeout()),
        }
    }
}
