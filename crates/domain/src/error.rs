//! Domain error taxonomy.

use event_store::{ProducerError, StoreError, TxError};
use projections::ReadModelError;
use thiserror::Error;

/// Stable classification of an error, used by the transport layer to pick
/// a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The aggregate has no events.
    NotFound,
    /// A required field on the command was missing or malformed.
    InvalidArgument,
    /// The command was rejected by projection-based validation.
    FailedPrecondition,
    /// A concurrent writer won the sequence number; retryable.
    Conflict,
    /// Infrastructure fault.
    Internal,
}

/// Errors from the projection engine.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The event type is not in the closed set.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The event payload did not decode.
    #[error("failed to decode {event_type} event: {source}")]
    Decode {
        event_type: &'static str,
        source: serde_json::Error,
    },
}

/// Errors from order command handlers and workflow methods.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("total price must not be negative")]
    InvalidTotalPrice,

    #[error("payment method is required")]
    PaymentMethodRequired,

    #[error("order is already cancelled")]
    AlreadyCancelled,

    #[error("cannot cancel an order that has already been delivered")]
    AlreadyDelivered,

    #[error("order has not been paid")]
    NotPaid,

    #[error("cannot cancel the order when updating shipping status, cancel the order instead")]
    CancelViaShippingUpdate,

    #[error("cannot set shipping status to a lower status")]
    LowerShippingStatus,

    /// Benign on consumer replay: payment was already initialized.
    #[error("order is not in pending payment status")]
    PaymentStatusNotPending,

    /// Benign on consumer replay: payment was already processed.
    #[error("order is not in initiated payment status")]
    PaymentStatusNotInitiated,

    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Producer(#[from] ProducerError),

    #[error(transparent)]
    ReadModel(#[from] ReadModelError),

    #[error(transparent)]
    Transaction(#[from] TxError),
}

impl OrderError {
    /// Classifies this error for the transport layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound => ErrorKind::NotFound,

            OrderError::MissingField(_)
            | OrderError::InvalidQuantity
            | OrderError::InvalidTotalPrice
            | OrderError::PaymentMethodRequired => ErrorKind::InvalidArgument,

            OrderError::AlreadyCancelled
            | OrderError::AlreadyDelivered
            | OrderError::NotPaid
            | OrderError::CancelViaShippingUpdate
            | OrderError::LowerShippingStatus
            | OrderError::PaymentStatusNotPending
            | OrderError::PaymentStatusNotInitiated => ErrorKind::FailedPrecondition,

            OrderError::Store(StoreError::SequenceConflict { .. })
            | OrderError::Producer(ProducerError::Store(StoreError::SequenceConflict { .. })) => {
                ErrorKind::Conflict
            }

            _ => ErrorKind::Internal,
        }
    }
}
