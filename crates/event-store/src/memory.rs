//! In-memory store, bus, and reader used by tests.
//!
//! They satisfy the same contracts as the Postgres and Kafka
//! implementations except durability: sequence uniqueness, ascending
//! event-id replay, required headers, and at-least-once redelivery of
//! uncommitted messages.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Notify, RwLock};

use crate::bus::{
    BusMessage, EventBus, HEADER_AGGREGATE_ID, HEADER_AGGREGATE_TYPE, HEADER_EVENT_TYPE,
    PublishArgs, Reader,
};
use crate::error::{BusError, StoreError};
use crate::event::{
    Event, EventId, PersistEventArgs, deserialize_aggregate_id, serialize_aggregate_id,
};
use crate::store::EventStore;
use crate::transactor::Tx;

/// In-memory event store implementation for testing.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    events: RwLock<HashMap<String, Vec<Event>>>,
    next_event_id: AtomicI64,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.events.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn persist(&self, _tx: &mut Tx, args: PersistEventArgs) -> Result<EventId, StoreError> {
        let key = serialize_aggregate_id(&args.aggregate_id, &args.aggregate_type);
        let mut events = self.inner.events.write().await;
        let aggregate_events = events.entry(key.clone()).or_default();

        if aggregate_events
            .iter()
            .any(|e| e.sequence_number == args.sequence_number)
        {
            return Err(StoreError::SequenceConflict {
                aggregate_id: args.aggregate_id,
                sequence_number: args.sequence_number.as_i64(),
            });
        }

        let event_id = EventId::new(self.inner.next_event_id.fetch_add(1, Ordering::SeqCst) + 1);

        aggregate_events.push(Event {
            event_id,
            sequence_number: args.sequence_number,
            aggregate_id: key,
            aggregate_type: args.aggregate_type,
            event_type: args.event_type,
            data: args.data,
            created_at: Utc::now(),
        });

        Ok(event_id)
    }

    async fn remove(&self, _tx: &mut Tx, event_id: EventId) -> Result<(), StoreError> {
        let mut events = self.inner.events.write().await;
        for aggregate_events in events.values_mut() {
            aggregate_events.retain(|e| e.event_id != event_id);
        }
        Ok(())
    }

    async fn list_by_aggregate_id(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>, StoreError> {
        let key = serialize_aggregate_id(aggregate_id, aggregate_type);
        let events = self.inner.events.read().await;

        let mut result: Vec<Event> = events
            .get(&key)
            .map(|aggregate_events| {
                aggregate_events
                    .iter()
                    .cloned()
                    .map(|mut event| {
                        let (bare_id, _) = deserialize_aggregate_id(&event.aggregate_id);
                        event.aggregate_id = bare_id;
                        event
                    })
                    .collect()
            })
            .unwrap_or_default();

        result.sort_by_key(|e| e.event_id);
        Ok(result)
    }
}

/// In-memory event bus backed by a shared append-only log.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    messages: RwLock<Vec<BusMessage>>,
    notify: Notify,
}

impl InMemoryEventBus {
    /// Creates a new empty in-memory bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader over this bus with its own committed offset,
    /// behaving like an independent consumer group.
    pub fn reader(&self) -> InMemoryReader {
        InMemoryReader {
            inner: self.inner.clone(),
            committed: 0,
        }
    }

    /// Returns a snapshot of every message published so far.
    pub async fn published(&self) -> Vec<BusMessage> {
        self.inner.messages.read().await.clone()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, args: PublishArgs) -> Result<(), BusError> {
        let mut messages = self.inner.messages.write().await;
        let offset = messages.len() as i64;

        let mut headers = HashMap::new();
        headers.insert(
            HEADER_EVENT_TYPE.to_string(),
            args.event_type.clone().into_bytes(),
        );
        headers.insert(
            HEADER_AGGREGATE_ID.to_string(),
            args.aggregate_id.clone().into_bytes(),
        );
        headers.insert(
            HEADER_AGGREGATE_TYPE.to_string(),
            args.aggregate_type.clone().into_bytes(),
        );

        messages.push(BusMessage {
            topic: "in-memory".to_string(),
            partition: 0,
            offset,
            headers,
            payload: args.value,
        });

        drop(messages);
        self.inner.notify.notify_waiters();
        Ok(())
    }
}

/// Reader over an [`InMemoryEventBus`].
///
/// `fetch` returns the first message past the committed offset, so a
/// message that was handled but never committed is redelivered.
pub struct InMemoryReader {
    inner: Arc<BusInner>,
    committed: usize,
}

#[async_trait]
impl Reader for InMemoryReader {
    async fn fetch(&mut self) -> Result<BusMessage, BusError> {
        loop {
            // Register for wakeup before checking the log, so a publish
            // that lands between the check and the await is not missed.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let messages = self.inner.messages.read().await;
                if let Some(message) = messages.get(self.committed) {
                    return Ok(message.clone());
                }
            }

            notified.await;
        }
    }

    async fn commit(&mut self, msg: &BusMessage) -> Result<(), BusError> {
        let next = (msg.offset as usize) + 1;
        if next > self.committed {
            self.committed = next;
        }
        Ok(())
    }
}
