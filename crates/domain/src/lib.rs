//! Domain layer for the order service.
//!
//! This crate carries the order workflow on top of the event-sourcing
//! substrate:
//! - the closed set of order event payloads
//! - the projection engine folding an event log into an `OrderProjection`
//! - the controller validating commands against the projection and
//!   emitting new events
//! - the three bus consumers driving the payment workflow and the
//!   materialized view

pub mod error;
pub mod order;

pub use error::{ErrorKind, OrderError, ProjectionError};
pub use order::consumers::{PaymentInitializer, PaymentProcessor, ProjectionIndexer};
pub use order::controller::{
    Controller, OrderCommands, OrderWorkflow, PlaceOrderRequest,
};
pub use order::projection::{OrderProjection, SerializedEvent, reduce_to_projection};
