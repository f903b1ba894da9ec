use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use event_store::Tx;

use crate::error::ReadModelError;
use crate::read_model::{DbProjection, ListArgs, ProjectionRepo, UpsertArgs};

/// In-memory projection repository for testing.
#[derive(Clone, Default)]
pub struct InMemoryProjectionRepo {
    rows: Arc<RwLock<HashMap<String, DbProjection>>>,
}

impl InMemoryProjectionRepo {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored row for an order, if any.
    pub async fn get(&self, order_id: &str) -> Option<DbProjection> {
        self.rows.read().await.get(order_id).cloned()
    }

    /// Returns the number of stored rows.
    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl ProjectionRepo for InMemoryProjectionRepo {
    async fn upsert(&self, _tx: &mut Tx, args: UpsertArgs) -> Result<(), ReadModelError> {
        let mut rows = self.rows.write().await;
        let now = Utc::now();

        rows.entry(args.order_id.clone())
            .and_modify(|row| {
                row.payment_status = args.payment_status;
                row.shipping_status = args.shipping_status;
                row.updated_at = now;
            })
            .or_insert_with(|| DbProjection {
                order_id: args.order_id,
                payment_status: args.payment_status,
                shipping_status: args.shipping_status,
                created_at: now,
                updated_at: now,
            });

        Ok(())
    }

    async fn list(&self, args: ListArgs) -> Result<Vec<DbProjection>, ReadModelError> {
        let rows = self.rows.read().await;
        let mut projections: Vec<DbProjection> = rows.values().cloned().collect();
        projections.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(projections
            .into_iter()
            .skip(args.offset as usize)
            .take(args.limit as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use common::{PaymentStatus, ShippingStatus};

    use super::*;

    fn upsert_args(order_id: &str, payment: PaymentStatus, shipping: ShippingStatus) -> UpsertArgs {
        UpsertArgs {
            order_id: order_id.to_string(),
            payment_status: payment,
            shipping_status: shipping,
        }
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates() {
        let repo = InMemoryProjectionRepo::new();
        let mut tx = Tx::Noop;

        repo.upsert(
            &mut tx,
            upsert_args(
                "order-1",
                PaymentStatus::Pending,
                ShippingStatus::WaitingForPayment,
            ),
        )
        .await
        .unwrap();

        let inserted = repo.get("order-1").await.unwrap();
        assert_eq!(inserted.payment_status, PaymentStatus::Pending);

        repo.upsert(
            &mut tx,
            upsert_args(
                "order-1",
                PaymentStatus::Paid,
                ShippingStatus::WaitingForShipment,
            ),
        )
        .await
        .unwrap();

        let updated = repo.get("order-1").await.unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
        assert_eq!(updated.shipping_status, ShippingStatus::WaitingForShipment);
        assert_eq!(updated.created_at, inserted.created_at);
        assert!(updated.updated_at >= inserted.updated_at);
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn list_orders_newest_first_with_pagination() {
        let repo = InMemoryProjectionRepo::new();
        let mut tx = Tx::Noop;

        for i in 0..5 {
            repo.upsert(
                &mut tx,
                upsert_args(
                    &format!("order-{i}"),
                    PaymentStatus::Pending,
                    ShippingStatus::WaitingForPayment,
                ),
            )
            .await
            .unwrap();
            // Distinct created_at values so the ordering is deterministic.
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let all = repo.list(ListArgs::default()).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].order_id, "order-4");
        assert_eq!(all[4].order_id, "order-0");

        let page = repo
            .list(ListArgs {
                limit: 2,
                offset: 1,
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].order_id, "order-3");
        assert_eq!(page[1].order_id, "order-2");
    }

    #[tokio::test]
    async fn list_defaults_limit_25() {
        let args = ListArgs::default();
        assert_eq!(args.limit, 25);
        assert_eq!(args.offset, 0);
    }
}
