use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use common::{PaymentStatus, ShippingStatus};
use event_store::Tx;

use crate::error::ReadModelError;
use crate::read_model::{DbProjection, ListArgs, PROJECTION_TABLE, ProjectionRepo, UpsertArgs};

/// PostgreSQL-backed projection repository.
#[derive(Clone)]
pub struct PgProjectionRepo {
    pool: PgPool,
}

impl PgProjectionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_projection(row: PgRow) -> Result<DbProjection, ReadModelError> {
        let payment_status: String = row.try_get("payment_status")?;
        let shipping_status: String = row.try_get("shipping_status")?;

        Ok(DbProjection {
            order_id: row.try_get("order_id")?,
            payment_status: payment_status.parse::<PaymentStatus>()?,
            shipping_status: shipping_status.parse::<ShippingStatus>()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ProjectionRepo for PgProjectionRepo {
    async fn upsert(&self, tx: &mut Tx, args: UpsertArgs) -> Result<(), ReadModelError> {
        let Tx::Postgres(tx) = tx else {
            return Err(ReadModelError::TxMismatch);
        };

        let query = format!(
            "INSERT INTO {PROJECTION_TABLE} (order_id, payment_status, shipping_status) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (order_id) DO UPDATE SET \
                 payment_status = EXCLUDED.payment_status, \
                 shipping_status = EXCLUDED.shipping_status, \
                 updated_at = now()"
        );

        sqlx::query(&query)
            .bind(&args.order_id)
            .bind(args.payment_status.as_str())
            .bind(args.shipping_status.as_str())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn list(&self, args: ListArgs) -> Result<Vec<DbProjection>, ReadModelError> {
        let query = format!(
            "SELECT order_id, payment_status, shipping_status, created_at, updated_at \
             FROM {PROJECTION_TABLE} \
             ORDER BY created_at DESC \
             LIMIT $1 OFFSET $2"
        );

        let rows = sqlx::query(&query)
            .bind(args.limit as i64)
            .bind(args.offset as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_projection).collect()
    }
}
