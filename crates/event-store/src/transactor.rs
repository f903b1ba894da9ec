//! Scoped database transactions.
//!
//! [`Transactor::with_tx`] hands the caller a [`Tx`] capability and
//! guarantees commit when the closure returns `Ok` and rollback on any
//! `Err` (via sqlx drop semantics), on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use sqlx::PgPool;

use crate::error::TxError;

/// A transaction capability handed to `with_tx` closures.
///
/// The `Noop` variant backs the in-memory implementations, which manage
/// their own locking and have no transactional state.
pub enum Tx {
    Postgres(sqlx::Transaction<'static, sqlx::Postgres>),
    Noop,
}

/// Scoped acquisition of a database transaction.
#[async_trait]
pub trait Transactor: Send + Sync {
    /// Runs `f` inside a transaction. Commits if `f` returns `Ok`, rolls
    /// back otherwise.
    async fn with_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        T: Send,
        E: From<TxError> + Send,
        F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<T, E>> + Send;
}

/// Pool-backed transactor for Postgres.
#[derive(Clone)]
pub struct PgTransactor {
    pool: PgPool,
}

impl PgTransactor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Transactor for PgTransactor {
    async fn with_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        T: Send,
        E: From<TxError> + Send,
        F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<T, E>> + Send,
    {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| E::from(TxError::Begin(e)))?;
        let mut tx = Tx::Postgres(tx);

        // An Err return drops the transaction here, which rolls it back.
        let value = f(&mut tx).await?;

        if let Tx::Postgres(tx) = tx {
            tx.commit().await.map_err(|e| E::from(TxError::Commit(e)))?;
        }

        Ok(value)
    }
}

/// Transactor for in-memory implementations and tests. Runs the closure
/// with a [`Tx::Noop`] capability and counts invocations.
#[derive(Clone, Default)]
pub struct NoopTransactor {
    calls: Arc<AtomicUsize>,
}

impl NoopTransactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `with_tx` has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transactor for NoopTransactor {
    async fn with_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        T: Send,
        E: From<TxError> + Send,
        F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<T, E>> + Send,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tx = Tx::Noop;
        f(&mut tx).await
    }
}
