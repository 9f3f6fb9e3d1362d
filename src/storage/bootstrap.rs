//! Schema bootstrap.
//!
//! Runs once at startup, before the listener binds. Each attempt acquires a
//! handle through the [`ConnectionManager`] (which has its own retry budget),
//! applies the schema in a transaction, commits and releases the handle. A
//! failed attempt releases its handle, waits the backoff and starts over.
//!
//! The bootstrap budget is larger than the connection budget because the
//! store may accept connections before its target database is provisioned.

use std::time::Duration;

use crate::retry::{RetryPolicy, retry};
use crate::storage::schema::apply_schema;
use crate::storage::{BootstrapAttemptError, BootstrapError, ConnectionManager};

/// Default bootstrap policy (10 attempts, 3 seconds apart).
pub const DEFAULT_BOOTSTRAP_RETRY: RetryPolicy = RetryPolicy::new(10, Duration::from_secs(3));

/// Ensures the schema exists before traffic is served.
#[derive(Debug, Clone)]
pub struct SchemaBootstrapper {
    connections: ConnectionManager,
    policy: RetryPolicy,
}

impl SchemaBootstrapper {
    /// Create a bootstrapper with the default policy.
    pub fn new(connections: ConnectionManager) -> Self {
        Self {
            connections,
            policy: DEFAULT_BOOTSTRAP_RETRY,
        }
    }

    /// Set the retry policy for the whole acquire-and-apply cycle.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create the schema if it does not exist yet.
    ///
    /// Idempotent. Fails with [`BootstrapError`] only after every attempt
    /// failed; callers must treat that as fatal.
    pub async fn ensure_schema(&self) -> Result<(), BootstrapError> {
        match retry(self.policy, "bootstrap", |_| true, |_| self.attempt()).await {
            Ok(()) => {
                tracing::info!("Database table 'todos' initialized");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    attempts = e.attempts,
                    error = %e.last,
                    "CRITICAL: schema bootstrap failed after all retries"
                );
                Err(BootstrapError {
                    attempts: e.attempts,
                    source: e.last,
                })
            }
        }
    }

    async fn attempt(&self) -> Result<(), BootstrapAttemptError> {
        let mut handle = self.connections.acquire().await?;
        let applied = apply_schema(&mut handle).await;
        handle.release().await;
        applied.map_err(BootstrapAttemptError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::MemoryStore;
    use crate::storage::{ConnectionParams, SchemaError, StorageError};
    use std::sync::Arc;

    fn bootstrapper(store: &MemoryStore) -> SchemaBootstrapper {
        let params = ConnectionParams {
            host: "db".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
        };
        SchemaBootstrapper::new(ConnectionManager::new(&params, Arc::new(store.clone())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_creates_table() {
        let store = MemoryStore::new();
        bootstrapper(&store).ensure_schema().await.unwrap();

        assert!(store.has_table("todos"));
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_twice_is_idempotent() {
        let store = MemoryStore::new();
        let bootstrapper = bootstrapper(&store);

        bootstrapper.ensure_schema().await.unwrap();
        bootstrapper.ensure_schema().await.unwrap();

        assert_eq!(store.tables(), vec!["todos".to_string()]);
        assert_eq!(store.connect_attempts(), 2);
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_recovers_from_schema_failures() {
        for failures in 1..=9u32 {
            let store = MemoryStore::new();
            store.fail_statements(failures);

            bootstrapper(&store).ensure_schema().await.unwrap();

            assert!(store.has_table("todos"));
            // One handle per attempt, every one of them released.
            assert_eq!(store.connect_attempts(), u64::from(failures) + 1);
            assert_eq!(store.open_sessions(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_fails_after_ten_attempts() {
        let store = MemoryStore::new();
        store.fail_statements(10);

        let err = bootstrapper(&store).ensure_schema().await.unwrap_err();

        assert_eq!(err.attempts, 10);
        assert!(matches!(
            err.source,
            BootstrapAttemptError::Schema(SchemaError::Apply(StorageError::Statement(_)))
        ));
        assert_eq!(store.connect_attempts(), 10);
        assert_eq!(store.open_sessions(), 0);
        assert!(!store.has_table("todos"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_recovers_from_commit_failures() {
        for failures in 1..=9u32 {
            let store = MemoryStore::new();
            store.fail_commits(failures);

            bootstrapper(&store).ensure_schema().await.unwrap();

            assert!(store.has_table("todos"));
            assert_eq!(store.connect_attempts(), u64::from(failures) + 1);
            // Every failed commit was rolled back before its handle closed.
            assert_eq!(store.rollbacks(), u64::from(failures));
            assert_eq!(store.open_sessions(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_fails_after_ten_commit_failures() {
        let store = MemoryStore::new();
        store.fail_commits(10);

        let err = bootstrapper(&store).ensure_schema().await.unwrap_err();

        assert_eq!(err.attempts, 10);
        assert!(matches!(
            err.source,
            BootstrapAttemptError::Schema(SchemaError::Commit(_))
        ));
        assert_eq!(store.connect_attempts(), 10);
        assert_eq!(store.rollbacks(), 10);
        assert_eq!(store.open_sessions(), 0);
        assert!(!store.has_table("todos"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failures_get_full_bootstrap_budget() {
        let store = MemoryStore::new();
        // First bootstrap attempt exhausts its 5 connects, the second
        // attempt connects on its third try.
        store.refuse_connections(7);

        bootstrapper(&store).ensure_schema().await.unwrap();

        assert_eq!(store.connect_attempts(), 8);
        assert!(store.has_table("todos"));
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_reports_connection_exhaustion() {
        let store = MemoryStore::new();
        store.refuse_connections(u32::MAX);

        let err = bootstrapper(&store)
            .with_policy(RetryPolicy::new(2, Duration::from_secs(1)))
            .ensure_schema()
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 2);
        assert!(matches!(
            err.source,
            BootstrapAttemptError::Connection(ref e) if e.attempts == 5
        ));
        assert_eq!(store.connect_attempts(), 10);
    }
}
