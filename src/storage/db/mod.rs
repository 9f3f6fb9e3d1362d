//! Database abstraction layer for multi-backend support.
//!
//! A backend provides a [`Connector`] that opens [`Session`]s. Sessions are
//! never shared: every operation opens its own through the
//! [`ConnectionManager`](crate::storage::ConnectionManager) and releases it
//! when done. There is no pooling.
//!
//! # Backends
//!
//! - [`PgConnector`]: PostgreSQL via sqlx, one `PgConnection` per session
//! - [`MemoryStore`]: in-process store with fault injection, for local runs
//!   and tests
//!
//! # Example
//!
//! ```ignore
//! let connector: Arc<dyn Connector> = Arc::new(PgConnector::new());
//! let mut session = connector.connect(&params).await?;
//! session.ping().await?;
//! ```

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgConnector;

use async_trait::async_trait;

use crate::storage::{ConnectionParams, StorageError, Todo};

/// Opens sessions to a store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Make a single connection attempt.
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Session>, StorageError>;
}

/// One open session to a store.
///
/// Dropping a session releases it; an open transaction is discarded.
#[async_trait]
pub trait Session: Send {
    /// Begin a transaction.
    async fn begin(&mut self) -> Result<(), StorageError>;

    /// Execute a statement that returns no rows.
    async fn execute(&mut self, sql: &str) -> Result<(), StorageError>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<(), StorageError>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<(), StorageError>;

    /// Round-trip to the store.
    async fn ping(&mut self) -> Result<(), StorageError>;

    /// Insert a todo with `completed = false` and return the stored row.
    async fn insert_todo(&mut self, task: &str) -> Result<Todo, StorageError>;

    /// List all todos ordered by id descending.
    async fn list_todos(&mut self) -> Result<Vec<Todo>, StorageError>;

    /// Close the session. Further calls fail with [`StorageError::Released`].
    async fn close(&mut self) -> Result<(), StorageError>;
}
