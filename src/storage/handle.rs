//! Scoped database handle.
//!
//! A [`Handle`] owns one backend session for the duration of a single
//! operation. Dropping it releases the session and discards any open
//! transaction, so every exit path (including `?` and cancellation) leaves
//! nothing behind. [`Handle::release`] does the same gracefully: it rolls
//! back an open transaction and closes the session before returning.

use crate::storage::db::Session;
use crate::storage::{StorageError, Todo};

/// A live session to the store, owned by exactly one operation.
pub struct Handle {
    session: Option<Box<dyn Session>>,
    in_transaction: bool,
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("open", &self.session.is_some())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl Handle {
    pub(crate) fn new(session: Box<dyn Session>) -> Self {
        Self {
            session: Some(session),
            in_transaction: false,
        }
    }

    fn session(&mut self) -> Result<&mut (dyn Session + 'static), StorageError> {
        self.session.as_deref_mut().ok_or(StorageError::Released)
    }

    /// Whether a transaction is currently open on this handle.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Begin a transaction.
    pub async fn begin(&mut self) -> Result<(), StorageError> {
        self.session()?.begin().await?;
        self.in_transaction = true;
        Ok(())
    }

    /// Execute a statement that returns no rows.
    pub async fn execute(&mut self, sql: &str) -> Result<(), StorageError> {
        self.session()?.execute(sql).await
    }

    /// Commit the open transaction.
    ///
    /// The transaction stays marked open if the commit fails, so releasing
    /// the handle still rolls it back.
    pub async fn commit(&mut self) -> Result<(), StorageError> {
        if !self.in_transaction {
            return Err(StorageError::NoTransaction);
        }
        self.session()?.commit().await?;
        self.in_transaction = false;
        Ok(())
    }

    /// Roll back the open transaction.
    pub async fn rollback(&mut self) -> Result<(), StorageError> {
        if !self.in_transaction {
            return Err(StorageError::NoTransaction);
        }
        self.in_transaction = false;
        self.session()?.rollback().await
    }

    /// Check that the session still answers.
    pub async fn ping(&mut self) -> Result<(), StorageError> {
        self.session()?.ping().await
    }

    /// Insert a todo and return the stored row.
    pub async fn insert_todo(&mut self, task: &str) -> Result<Todo, StorageError> {
        self.session()?.insert_todo(task).await
    }

    /// List all todos ordered by id, newest first.
    pub async fn list_todos(&mut self) -> Result<Vec<Todo>, StorageError> {
        self.session()?.list_todos().await
    }

    /// Release the handle: roll back an open transaction, then close.
    ///
    /// Cleanup failures are logged, never returned; the session is gone
    /// either way.
    pub async fn release(mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if self.in_transaction {
            self.in_transaction = false;
            if let Err(e) = session.rollback().await {
                tracing::warn!(error = %e, "Rollback on release failed");
            }
        }

        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "Closing database session failed");
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.session.take().is_some() && self.in_transaction {
            tracing::debug!("Handle dropped inside a transaction, discarding it");
        }
    }
}
