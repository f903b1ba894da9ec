//! Event-sourcing substrate for the order service.
//!
//! This crate provides the infrastructure the domain layer is built on:
//! - an append-only event store (Postgres and in-memory)
//! - scoped database transactions via the [`Transactor`] abstraction
//! - a durable event bus with required routing headers (Kafka and
//!   in-memory)
//! - a transactional producer coupling event persistence with bus
//!   publication
//! - an at-least-once consumer runtime committing offsets only after
//!   successful handling

pub mod bus;
pub mod consumer;
pub mod error;
pub mod event;
pub mod kafka;
pub mod memory;
pub mod postgres;
pub mod producer;
pub mod store;
pub mod transactor;

pub use bus::{
    BusMessage, EventBus, HEADER_AGGREGATE_ID, HEADER_AGGREGATE_TYPE, HEADER_EVENT_TYPE,
    PUBLISH_TIMEOUT, PublishArgs, Reader,
};
pub use consumer::{
    CONSUMER_RETRY_DELAY, ConsumeArgs, ConsumerOptions, EventConsumer, HandlerError, run_consumer,
};
pub use error::{BusError, ProducerError, StoreError, TxError};
pub use event::{Event, EventId, PersistEventArgs, SequenceNumber};
pub use kafka::{KafkaEventBus, KafkaReader};
pub use memory::{InMemoryEventBus, InMemoryEventStore, InMemoryReader};
pub use postgres::PostgresEventStore;
pub use producer::{Producer, SendArgs, TransactionalProducer};
pub use store::EventStore;
pub use transactor::{NoopTransactor, PgTransactor, Transactor, Tx};
