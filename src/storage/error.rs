//! Storage-specific error types.
//!
//! - [`StorageError`]: a single backend operation failed.
//! - [`ConnectionError`]: the connection manager gave up acquiring a handle.
//! - [`SchemaError`]: applying or committing the schema failed on a live handle.
//! - [`BootstrapError`]: every bootstrap attempt failed; the service must not start.

use thiserror::Error;

/// Errors that can occur in a single storage operation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store did not accept the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The store rejected a statement.
    #[error("statement failed: {0}")]
    Statement(String),

    /// A statement referenced a table that has not been created.
    #[error("relation \"{0}\" does not exist")]
    MissingRelation(String),

    /// The backend cannot execute this statement.
    #[error("unsupported statement: {0}")]
    Unsupported(String),

    /// Commit or rollback without an open transaction.
    #[error("no transaction in progress")]
    NoTransaction,

    /// The handle was already released.
    #[error("handle already released")]
    Released,
}

impl StorageError {
    /// Whether a failed connection attempt is worth repeating.
    ///
    /// Only connection configuration problems are permanent; refusals, I/O
    /// failures and server-side startup errors may clear up on their own.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            Self::Database(sqlx::Error::Configuration(_)) | Self::Unsupported(_) | Self::Released
        )
    }
}

/// The connection manager exhausted its attempts.
#[derive(Debug, Error)]
#[error("could not connect to database after {attempts} attempt(s): {source}")]
pub struct ConnectionError {
    /// Number of connection attempts performed.
    pub attempts: u32,
    /// Failure of the last attempt.
    #[source]
    pub source: StorageError,
}

/// Applying the schema failed on an acquired handle.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Beginning the transaction or executing a schema statement failed.
    #[error("failed to apply schema: {0}")]
    Apply(#[source] StorageError),

    /// The schema transaction did not commit.
    #[error("failed to commit schema: {0}")]
    Commit(#[source] StorageError),
}

/// Failure of one bootstrap attempt.
#[derive(Debug, Error)]
pub enum BootstrapAttemptError {
    /// No handle could be acquired.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A handle was acquired but the schema was not established.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Every bootstrap attempt failed. Fatal: the listener must not bind.
#[derive(Debug, Error)]
#[error("schema bootstrap failed after {attempts} attempt(s): {source}")]
pub struct BootstrapError {
    /// Number of bootstrap attempts performed.
    pub attempts: u32,
    /// Failure of the last attempt.
    #[source]
    pub source: BootstrapAttemptError,
}
