use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{PaymentStatus, ShippingStatus};
use event_store::Tx;

use crate::error::ReadModelError;

/// Table holding the materialized projections.
pub const PROJECTION_TABLE: &str = "order_projection";

/// One materialized projection row.
#[derive(Debug, Clone, PartialEq)]
pub struct DbProjection {
    pub order_id: String,
    pub payment_status: PaymentStatus,
    pub shipping_status: ShippingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Arguments for upserting a projection row.
#[derive(Debug, Clone)]
pub struct UpsertArgs {
    pub order_id: String,
    pub payment_status: PaymentStatus,
    pub shipping_status: ShippingStatus,
}

/// Pagination arguments for listing projections.
#[derive(Debug, Clone, Copy)]
pub struct ListArgs {
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            limit: 25,
            offset: 0,
        }
    }
}

/// Repository of materialized order projections.
#[async_trait]
pub trait ProjectionRepo: Send + Sync {
    /// Inserts or updates a projection row within the caller's
    /// transaction. Updates refresh `updated_at`; `created_at` is kept
    /// from the first insert.
    async fn upsert(&self, tx: &mut Tx, args: UpsertArgs) -> Result<(), ReadModelError>;

    /// Lists projection rows ordered by `created_at` descending.
    async fn list(&self, args: ListArgs) -> Result<Vec<DbProjection>, ReadModelError>;
}
