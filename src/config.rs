//! Configuration module for the todo service.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Database settings (driver, connection parameters, retry policies)

mod app;
mod validation;

pub use app::{AppConfig, DatabaseConfig, DatabaseDriver, ServerConfig};
pub use validation::{ConfigError, expand_env_vars};

// Re-export constants
pub use app::{DEFAULT_DB_PORT, DEFAULT_REQUEST_RETRY, DEFAULT_SERVER_PORT};
