//! Application configuration structures.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::retry::RetryPolicy;
use crate::storage::{ConnectionParams, DEFAULT_BOOTSTRAP_RETRY, DEFAULT_CONNECT_RETRY};

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default HTTP listen port.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default PostgreSQL port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default per-request connection policy: a single attempt.
pub const DEFAULT_REQUEST_RETRY: RetryPolicy = RetryPolicy::once();

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 5000).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

impl ServerConfig {
    /// Listen address built from the bind IP and port.
    ///
    /// IPv6 binds such as `::` are supported.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if `bind` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!("invalid server bind address: '{}'", self.bind))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Database backend selection.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DatabaseDriver {
    /// PostgreSQL server.
    #[default]
    Postgres,
    /// In-process store; data is lost on exit.
    Memory,
}

/// Database configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backend driver (default: postgres).
    pub driver: DatabaseDriver,

    /// Server host (default: "localhost").
    pub host: String,

    /// Server port (default: 5432).
    pub port: u16,

    /// Database name (default: "postgres").
    pub name: String,

    /// Login role (default: "postgres").
    pub user: String,

    /// Login password (default: empty).
    pub password: String,

    /// Connection attempts per acquire at startup (default: 5 x 3s).
    pub connect_retry: RetryPolicy,

    /// Whole bootstrap cycles (default: 10 x 3s).
    pub bootstrap_retry: RetryPolicy,

    /// Connection attempts per HTTP request (default: 1).
    pub request_retry: RetryPolicy,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            host: "localhost".to_string(),
            port: DEFAULT_DB_PORT,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            connect_retry: DEFAULT_CONNECT_RETRY,
            bootstrap_retry: DEFAULT_BOOTSTRAP_RETRY,
            request_retry: DEFAULT_REQUEST_RETRY,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("connect_retry", &self.connect_retry)
            .field("bootstrap_retry", &self.bootstrap_retry)
            .field("request_retry", &self.request_retry)
            .finish_non_exhaustive()
    }
}

impl DatabaseConfig {
    /// Build the immutable connection parameters.
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            database: self.name.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&expand_env_vars(&content))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.socket_addr()?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if self.database.driver == DatabaseDriver::Postgres {
            if self.database.port == 0 {
                return Err(ConfigError::ValidationError(
                    "database port must be non-zero".to_string(),
                ));
            }

            for (field, value) in [
                ("host", &self.database.host),
                ("name", &self.database.name),
                ("user", &self.database.user),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "database {field} cannot be empty"
                    )));
                }
            }
        }

        for (field, policy) in [
            ("connect_retry", &self.database.connect_retry),
            ("bootstrap_retry", &self.database.bootstrap_retry),
            ("request_retry", &self.database.request_retry),
        ] {
            if policy.attempts == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "database {field}.attempts must be positive"
                )));
            }
        }

        Ok(())
    }
}
