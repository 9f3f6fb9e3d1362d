//! Storage Layer
//!
//! Connection management and schema bootstrap for the todo store:
//! - **Connections**: one fresh handle per operation, retried with fixed backoff
//! - **Bootstrap**: idempotent schema creation before the listener binds
//!
//! # Components
//!
//! - [`ConnectionManager`]: Acquires [`Handle`]s using fixed [`ConnectionParams`]
//! - [`SchemaBootstrapper`]: Retries acquire + apply schema + commit as one unit
//! - [`Handle`]: Scoped session; released on every exit path
//! - [`db`]: Backend trait seam with PostgreSQL and in-memory implementations

mod bootstrap;
mod connection;
pub mod db;
mod error;
mod handle;
pub mod schema;
mod types;

pub use bootstrap::{DEFAULT_BOOTSTRAP_RETRY, SchemaBootstrapper};
pub use connection::{ConnectionManager, DEFAULT_CONNECT_RETRY};
pub use error::{BootstrapAttemptError, BootstrapError, ConnectionError, SchemaError, StorageError};
pub use handle::Handle;
pub use types::{ConnectionParams, Todo};
