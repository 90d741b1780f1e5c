use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as OrderEntity, Model as OrderModel,
};
use crate::errors::ServiceError;
use crate::models::{Customer, Order, OrderStatus};

use super::OrderRepository;

/// Order repository backed by SeaORM (SQLite or Postgres)
#[derive(Debug, Clone)]
pub struct SeaOrmOrderRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmOrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl TryFrom<OrderModel> for Order {
    type Error = ServiceError;

    fn try_from(model: OrderModel) -> Result<Self, Self::Error> {
        let product_code = model.product_code.parse().map_err(|e: String| {
            ServiceError::InternalError(format!("order {}: {}", model.order_id, e))
        })?;
        let status = model.status.parse().map_err(|e: String| {
            ServiceError::InternalError(format!("order {}: {}", model.order_id, e))
        })?;
        let quantity = u32::try_from(model.quantity).map_err(|_| {
            ServiceError::InternalError(format!(
                "order {}: negative quantity {}",
                model.order_id, model.quantity
            ))
        })?;

        Ok(Order {
            order_id: model.order_id,
            product_code,
            quantity,
            gross_amount: model.gross_amount,
            customer: Customer {
                name: model.customer_name,
                email: model.customer_email,
                phone: model.customer_phone,
            },
            status,
            provider_token: model.provider_token,
            redirect_url: model.redirect_url,
            provider_transaction_id: model.provider_transaction_id,
            payment_type: model.payment_type,
            last_provider_status: model.last_provider_status,
            next_reconcile_at: model.next_reconcile_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
            expires_at: model.expires_at,
        })
    }
}

fn to_active_model(order: &Order) -> Result<OrderActiveModel, ServiceError> {
    let quantity = i32::try_from(order.quantity).map_err(|_| {
        ServiceError::InvalidAmount(format!("quantity {} is too large", order.quantity))
    })?;

    Ok(OrderActiveModel {
        order_id: Set(order.order_id.clone()),
        product_code: Set(order.product_code.as_str().to_string()),
        quantity: Set(quantity),
        gross_amount: Set(order.gross_amount),
        customer_name: Set(order.customer.name.clone()),
        customer_email: Set(order.customer.email.clone()),
        customer_phone: Set(order.customer.phone.clone()),
        status: Set(order.status.as_str().to_string()),
        provider_token: Set(order.provider_token.clone()),
        redirect_url: Set(order.redirect_url.clone()),
        provider_transaction_id: Set(order.provider_transaction_id.clone()),
        payment_type: Set(order.payment_type.clone()),
        last_provider_status: Set(order.last_provider_status.clone()),
        next_reconcile_at: Set(order.next_reconcile_at),
        created_at: Set(order.created_at),
        updated_at: Set(order.updated_at),
        expires_at: Set(order.expires_at),
    })
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), ServiceError> {
        to_active_model(order)?.insert(self.db()).await?;
        Ok(())
    }

    async fn find(&self, order_id: &str) -> Result<Option<Order>, ServiceError> {
        OrderEntity::find_by_id(order_id.to_string())
            .one(self.db())
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn update(&self, order: &Order) -> Result<(), ServiceError> {
        let exists = OrderEntity::find_by_id(order.order_id.clone())
            .one(self.db())
            .await?
            .is_some();
        if !exists {
            return Err(ServiceError::NotFound(format!(
                "order {} not found",
                order.order_id
            )));
        }

        to_active_model(order)?.update(self.db()).await?;
        Ok(())
    }

    async fn find_unsettled_expired_before(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Order>, ServiceError> {
        OrderEntity::find()
            .filter(Column::Status.is_in([
                OrderStatus::Created.as_str(),
                OrderStatus::Pending.as_str(),
            ]))
            .filter(Column::ExpiresAt.lte(now))
            .filter(
                Condition::any()
                    .add(Column::NextReconcileAt.is_null())
                    .add(Column::NextReconcileAt.lte(now)),
            )
            .order_by_asc(Column::ExpiresAt)
            .limit(limit)
            .all(self.db())
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn defer_reconcile(
        &self,
        order_id: &str,
        until: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let result = OrderEntity::update_many()
            .col_expr(Column::NextReconcileAt, Expr::value(until))
            .filter(Column::OrderId.eq(order_id))
            .exec(self.db())
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("order {} not found", order_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::repositories::test_support::sample_order;

    async fn repository() -> SeaOrmOrderRepository {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = establish_connection_with_config(&config).await.unwrap();
        run_migrations(&db).await.unwrap();
        SeaOrmOrderRepository::new(Arc::new(db))
    }

    #[tokio::test]
    async fn insert_then_find_preserves_every_field() {
        let repo = repository().await;
        let mut order = sample_order("MOCHI-DB-1", OrderStatus::Created, 60);
        order.payment_type = Some("bank_transfer".into());
        repo.insert(&order).await.unwrap();

        let loaded = repo.find("MOCHI-DB-1").await.unwrap().unwrap();
        assert_eq!(loaded.customer, order.customer);
        assert_eq!(loaded.gross_amount, 150_000);
        assert_eq!(loaded.provider_token.as_deref(), Some("tok-1"));
        assert_eq!(loaded.payment_type.as_deref(), Some("bank_transfer"));
        assert_eq!(loaded.status, OrderStatus::Created);

        assert!(repo.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_persists_status_and_rejects_unknown() {
        let repo = repository().await;
        let mut order = sample_order("MOCHI-DB-2", OrderStatus::Created, 60);
        repo.insert(&order).await.unwrap();

        order.status = OrderStatus::Settled;
        order.last_provider_status = Some("settlement".into());
        repo.update(&order).await.unwrap();
        let loaded = repo.find("MOCHI-DB-2").await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Settled);
        assert_eq!(loaded.last_provider_status.as_deref(), Some("settlement"));

        let ghost = sample_order("MOCHI-DB-404", OrderStatus::Pending, 60);
        assert!(matches!(
            repo.update(&ghost).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let repo = repository().await;
        let order = sample_order("MOCHI-DB-3", OrderStatus::Created, 60);
        repo.insert(&order).await.unwrap();
        assert!(repo.insert(&order).await.is_err());
    }

    #[tokio::test]
    async fn expired_scan_filters_by_status_and_deadline() {
        let repo = repository().await;
        repo.insert(&sample_order("due", OrderStatus::Pending, -3))
            .await
            .unwrap();
        repo.insert(&sample_order("done", OrderStatus::Denied, -3))
            .await
            .unwrap();
        repo.insert(&sample_order("live", OrderStatus::Created, 30))
            .await
            .unwrap();

        let due = repo
            .find_unsettled_expired_before(Utc::now(), 50)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].order_id, "due");
    }

    #[tokio::test]
    async fn deferral_is_persisted_and_respected_by_the_scan() {
        let repo = repository().await;
        repo.insert(&sample_order("held", OrderStatus::Pending, -3))
            .await
            .unwrap();
        let now = Utc::now();
        let until = now + chrono::Duration::minutes(30);

        repo.defer_reconcile("held", until).await.unwrap();

        let stored = repo.find("held").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert!(stored.next_reconcile_at.is_some());
        assert!(repo
            .find_unsettled_expired_before(now, 50)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.find_unsettled_expired_before(until + chrono::Duration::seconds(1), 50)
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(matches!(
            repo.defer_reconcile("ghost", until).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
