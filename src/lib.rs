//! Todo Service Library
//!
//! A small HTTP service storing todo items in PostgreSQL. The service may
//! start before its database is reachable: connections are retried with a
//! fixed backoff, and the schema is created idempotently before the HTTP
//! listener binds.
//!
//! # Architecture
//!
//! - **Retry**: Reusable bounded retry with fixed backoff
//! - **Storage**: Connection manager, schema bootstrapper, backends
//! - **Server**: Axum router with the todo endpoints and health probes
//! - **Config**: YAML configuration with environment overrides
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use todo_service::{ConnectionManager, ConnectionParams, PgConnector, SchemaBootstrapper};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ConnectionParams {
//!     host: "localhost".to_string(),
//!     port: 5432,
//!     database: "postgres".to_string(),
//!     user: "postgres".to_string(),
//!     password: "postgres".to_string(),
//! };
//! let connections = ConnectionManager::new(&params, Arc::new(PgConnector::new()));
//! SchemaBootstrapper::new(connections.clone()).ensure_schema().await?;
//!
//! let mut handle = connections.acquire().await?;
//! let todo = handle.insert_todo("buy milk").await?;
//! handle.release().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod retry;
pub mod server;
pub mod storage;

pub use retry::{RetryPolicy, retry};
pub use storage::db::{Connector, MemoryStore, PgConnector, Session};
pub use storage::{
    BootstrapError, ConnectionError, ConnectionManager, ConnectionParams, Handle,
    SchemaBootstrapper, SchemaError, StorageError, Todo,
};
