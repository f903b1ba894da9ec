use common::InvalidStatus;
use thiserror::Error;

/// Errors from the projection repository.
#[derive(Debug, Error)]
pub enum ReadModelError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored status column did not parse back into its enum.
    #[error("corrupt projection row: {0}")]
    CorruptRow(#[from] InvalidStatus),

    /// The repository was handed a transaction it cannot execute against.
    #[error("postgres projection repo requires a postgres transaction")]
    TxMismatch,
}
