use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::StoreError;
use crate::event::{
    Event, EventId, PersistEventArgs, SequenceNumber, deserialize_aggregate_id,
    serialize_aggregate_id,
};
use crate::store::EventStore;
use crate::transactor::Tx;

/// PostgreSQL-backed event store.
///
/// Event ids come from a BIGSERIAL column; the aggregate key is stored
/// denormalized as `"{aggregate_type}:{aggregate_id}"` so replay is a
/// single indexed scan. The table name is configurable.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
    table: String,
}

impl PostgresEventStore {
    /// Creates a new Postgres event store over the given table.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: PgRow) -> Result<Event, StoreError> {
        let stored_key: String = row.try_get("aggregate_id")?;
        let (aggregate_id, aggregate_type) = deserialize_aggregate_id(&stored_key);

        Ok(Event {
            event_id: EventId::new(row.try_get("event_id")?),
            sequence_number: SequenceNumber::new(row.try_get("sequence_number")?),
            aggregate_id,
            aggregate_type,
            event_type: row.try_get("event_type")?,
            data: row.try_get("event_data")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn persist(&self, tx: &mut Tx, args: PersistEventArgs) -> Result<EventId, StoreError> {
        let Tx::Postgres(tx) = tx else {
            return Err(StoreError::TxMismatch);
        };

        let query = format!(
            "INSERT INTO {} (aggregate_id, sequence_number, aggregate_type, event_type, event_data) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING event_id",
            self.table
        );

        let aggregate_key = serialize_aggregate_id(&args.aggregate_id, &args.aggregate_type);

        let event_id: i64 = sqlx::query_scalar(&query)
            .bind(&aggregate_key)
            .bind(args.sequence_number.as_i64())
            .bind(&args.aggregate_type)
            .bind(&args.event_type)
            .bind(&args.data)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_sequence")
                {
                    return StoreError::SequenceConflict {
                        aggregate_id: args.aggregate_id.clone(),
                        sequence_number: args.sequence_number.as_i64(),
                    };
                }
                StoreError::Database(e)
            })?;

        Ok(EventId::new(event_id))
    }

    async fn remove(&self, tx: &mut Tx, event_id: EventId) -> Result<(), StoreError> {
        let Tx::Postgres(tx) = tx else {
            return Err(StoreError::TxMismatch);
        };

        let query = format!("DELETE FROM {} WHERE event_id = $1", self.table);

        sqlx::query(&query)
            .bind(event_id.as_i64())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn list_by_aggregate_id(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>, StoreError> {
        let query = format!(
            "SELECT event_id, sequence_number, aggregate_id, aggregate_type, event_type, event_data, created_at \
             FROM {} \
             WHERE aggregate_id = $1 \
             ORDER BY event_id ASC",
            self.table
        );

        let rows = sqlx::query(&query)
            .bind(serialize_aggregate_id(aggregate_id, aggregate_type))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }
}
