use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::errors::ServiceError;
use crate::models::{Order, OrderStatus};

pub mod order_repository;

pub use order_repository::SeaOrmOrderRepository;

/// Storage seam for orders.
///
/// Orders are written once, complete, at checkout and afterwards only
/// updated by the status applier while it holds the per-order lock.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a new order; fails if the reference already exists.
    async fn insert(&self, order: &Order) -> Result<(), ServiceError>;

    async fn find(&self, order_id: &str) -> Result<Option<Order>, ServiceError>;

    /// Overwrites an existing order; `NotFound` if it was never inserted.
    async fn update(&self, order: &Order) -> Result<(), ServiceError>;

    /// Orders still `created` or `pending` whose payment window closed before
    /// `now` and whose reconcile deferral, if any, has passed.
    async fn find_unsettled_expired_before(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Order>, ServiceError>;

    /// Keeps the order out of reconcile sweeps until `until`. Touches no other column.
    async fn defer_reconcile(&self, order_id: &str, until: DateTime<Utc>)
        -> Result<(), ServiceError>;
}

/// Process-local order store, used by tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<String, Order>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), ServiceError> {
        use dashmap::mapref::entry::Entry;
        match self.orders.entry(order.order_id.clone()) {
            Entry::Occupied(_) => Err(ServiceError::InternalError(format!(
                "order {} already exists",
                order.order_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(())
            }
        }
    }

    async fn find(&self, order_id: &str) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.get(order_id).map(|o| o.value().clone()))
    }

    async fn update(&self, order: &Order) -> Result<(), ServiceError> {
        match self.orders.get_mut(&order.order_id) {
            Some(mut existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(ServiceError::NotFound(format!(
                "order {} not found",
                order.order_id
            ))),
        }
    }

    async fn find_unsettled_expired_before(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Order>, ServiceError> {
        let mut due: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| {
                matches!(o.status, OrderStatus::Created | OrderStatus::Pending)
                    && o.is_due_for_reconcile(now)
            })
            .map(|o| o.value().clone())
            .collect();
        due.sort_by_key(|o| o.expires_at);
        due.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(due)
    }

    async fn defer_reconcile(
        &self,
        order_id: &str,
        until: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        match self.orders.get_mut(order_id) {
            Some(mut order) => {
                order.next_reconcile_at = Some(until);
                Ok(())
            }
            None => Err(ServiceError::NotFound(format!("order {} not found", order_id))),
        }
    }
}
