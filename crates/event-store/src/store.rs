use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::{Event, EventId, PersistEventArgs};
use crate::transactor::Tx;

/// Append-only event store.
///
/// Writes run inside the caller's transaction so the producer can couple
/// persistence with publication. All implementations must be thread-safe
/// and must enforce uniqueness of `(aggregate, sequence_number)`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Inserts one event within the caller's transaction and returns the
    /// identifier the store assigned to it.
    async fn persist(&self, tx: &mut Tx, args: PersistEventArgs) -> Result<EventId, StoreError>;

    /// Deletes an event by id within the caller's transaction. Removing
    /// an absent event is not an error.
    async fn remove(&self, tx: &mut Tx, event_id: EventId) -> Result<(), StoreError>;

    /// Returns every event of one aggregate in ascending event id, which
    /// within an aggregate equals sequence-number order.
    async fn list_by_aggregate_id(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>, StoreError>;
}
