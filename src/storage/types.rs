//! Core data types for the storage layer.
//!
//! - [`ConnectionParams`]: where and as whom to connect
//! - [`Todo`]: a row of the `todos` table

use serde::{Deserialize, Serialize};

/// Parameters for opening a database session.
///
/// Built once at startup from [`DatabaseConfig`](crate::config::DatabaseConfig)
/// and never modified afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Database server host name or address.
    pub host: String,
    /// Database server port.
    pub port: u16,
    /// Name of the database to connect to.
    pub database: String,
    /// Login role.
    pub user: String,
    /// Login password.
    pub password: String,
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// A todo item stored in the `todos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Identifier assigned by the store.
    pub id: i64,
    /// Task description.
    pub task: String,
    /// Completion flag (false on creation).
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParams {
        ConnectionParams {
            host: "db".to_string(),
            port: 5432,
            database: "todos".to_string(),
            user: "app".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_connection_params_hide_password() {
        let debug = format!("{:?}", params());
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(params().to_string(), "app@db:5432/todos");
    }

    #[test]
    fn test_todo_json_shape() {
        let todo = Todo {
            id: 1,
            task: "buy milk".to_string(),
            completed: false,
        };
        assert_eq!(
            serde_json::to_value(&todo).unwrap(),
            serde_json::json!({"id": 1, "task": "buy milk", "completed": false})
        );
    }
}
