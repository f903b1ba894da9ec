use async_trait::async_trait;

use crate::bus::{EventBus, PublishArgs};
use crate::error::{ProducerError, StoreError};
use crate::event::{EventId, PersistEventArgs, SequenceNumber};
use crate::store::EventStore;
use crate::transactor::Transactor;

/// Arguments for sending one event through the producer.
#[derive(Debug, Clone)]
pub struct SendArgs {
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub value: Vec<u8>,
    pub sequence_number: SequenceNumber,
}

/// The interface for sending events.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn send(&self, args: SendArgs) -> Result<(), ProducerError>;
}

/// Producer that atomically couples event persistence with bus
/// publication.
#[derive(Clone)]
pub struct TransactionalProducer<S, B, T> {
    store: S,
    bus: B,
    transactor: T,
}

impl<S, B, T> TransactionalProducer<S, B, T> {
    pub fn new(store: S, bus: B, transactor: T) -> Self {
        Self {
            store,
            bus,
            transactor,
        }
    }
}

#[async_trait]
impl<S, B, T> Producer for TransactionalProducer<S, B, T>
where
    S: EventStore + Clone + 'static,
    B: EventBus,
    T: Transactor,
{
    async fn send(&self, args: SendArgs) -> Result<(), ProducerError> {
        // The event must be committed to the store before it is published,
        // otherwise a consumer could observe it before it is durable.
        let store = self.store.clone();
        let persist_args = PersistEventArgs {
            sequence_number: args.sequence_number,
            aggregate_id: args.aggregate_id.clone(),
            aggregate_type: args.aggregate_type.clone(),
            event_type: args.event_type.clone(),
            data: args.value.clone(),
        };

        let event_id: EventId = self
            .transactor
            .with_tx(move |tx| Box::pin(async move { store.persist(tx, persist_args).await }))
            .await?;

        let published = self
            .bus
            .publish(PublishArgs {
                aggregate_id: args.aggregate_id,
                aggregate_type: args.aggregate_type,
                event_type: args.event_type,
                value: args.value,
            })
            .await;

        // If the event could not be published, remove it from the store so
        // no reader ever sees an event that was never announced. The
        // original publish error is surfaced either way.
        if let Err(publish_err) = published {
            tracing::warn!(
                error = %publish_err,
                event_id = %event_id,
                "failed to publish event, removing it from the store"
            );

            let store = self.store.clone();
            let removed: Result<(), StoreError> = self
                .transactor
                .with_tx(move |tx| Box::pin(async move { store.remove(tx, event_id).await }))
                .await;

            if let Err(remove_err) = removed {
                tracing::error!(
                    error = %remove_err,
                    event_id = %event_id,
                    "failed to remove unpublished event from the store"
                );
            }

            return Err(ProducerError::Publish(publish_err));
        }

        Ok(())
    }
}
