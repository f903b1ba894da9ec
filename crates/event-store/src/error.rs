use std::time::Duration;

use thiserror::Error;

/// Errors from the scoped-transaction layer.
#[derive(Debug, Error)]
pub enum TxError {
    /// The transaction could not be started.
    #[error("failed to start transaction: {0}")]
    Begin(#[source] sqlx::Error),

    /// The transaction could not be committed.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),
}

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer already persisted this sequence number for the
    /// aggregate. Retryable: re-read the projection and try again.
    #[error("duplicate sequence number {sequence_number} for aggregate {aggregate_id}")]
    SequenceConflict {
        aggregate_id: String,
        sequence_number: i64,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store was handed a transaction it cannot execute against.
    #[error("postgres event store requires a postgres transaction")]
    TxMismatch,

    /// The surrounding transaction failed.
    #[error(transparent)]
    Transaction(#[from] TxError),
}

/// Errors that can occur on the event bus, reader side included.
#[derive(Debug, Error)]
pub enum BusError {
    /// Connecting to the broker failed.
    #[error("failed to connect to broker: {0}")]
    Connection(String),

    /// Publishing a message failed.
    #[error("failed to publish message: {0}")]
    Publish(String),

    /// Publishing did not complete within the bounded timeout.
    #[error("publish timed out after {0:?}")]
    PublishTimeout(Duration),

    /// Fetching the next message failed.
    #[error("failed to fetch message: {0}")]
    Fetch(String),

    /// Committing a handled message failed.
    #[error("failed to commit message: {0}")]
    Commit(String),

    /// A required routing header was absent from the message.
    #[error("{0} not found in message")]
    MissingHeader(&'static str),

    /// A required routing header was present but not valid UTF-8.
    #[error("{0} header is not valid utf-8")]
    InvalidHeader(&'static str),

    /// The consumer handler rejected the message.
    #[error("consumer {consumer} failed: {message}")]
    Consume {
        consumer: &'static str,
        message: String,
    },

    /// The consumer loop was cancelled.
    #[error("consumer cancelled")]
    Cancelled,
}

/// Errors surfaced by the transactional producer.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Persisting the event failed; nothing was published.
    #[error("failed to persist event: {0}")]
    Store(#[from] StoreError),

    /// Publishing failed after the event was persisted. The compensating
    /// remove ran best-effort, so the effect is uncertain.
    #[error("failed to publish event: {0}")]
    Publish(#[from] BusError),
}
