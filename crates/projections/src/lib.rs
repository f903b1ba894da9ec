//! Materialized order projections.
//!
//! The query-side read model maintained by the projection-indexer
//! consumer: a repository of `(order_id, payment_status, shipping_status)`
//! rows, upserted under a transaction and listed by creation time.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod read_model;

pub use error::ReadModelError;
pub use memory::InMemoryProjectionRepo;
pub use postgres::PgProjectionRepo;
pub use read_model::{DbProjection, ListArgs, PROJECTION_TABLE, ProjectionRepo, UpsertArgs};
