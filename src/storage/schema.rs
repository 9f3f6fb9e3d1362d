//! Database schema definitions and the statements run against it.

use crate::storage::{Handle, SchemaError};

/// SQL statement for creating the todos table.
///
/// Safe to run any number of times, from any number of processes.
pub const TODOS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS todos (
    id        SERIAL PRIMARY KEY,
    task      TEXT NOT NULL,
    completed BOOLEAN DEFAULT FALSE
);
"#;

/// Insert a todo and return the stored row.
pub const INSERT_TODO_SQL: &str =
    "INSERT INTO todos (task) VALUES ($1) RETURNING id, task, completed";

/// List all todos, newest first.
pub const LIST_TODOS_SQL: &str = "SELECT id, task, completed FROM todos ORDER BY id DESC";

/// Statements establishing the full schema, in order.
pub const SCHEMA: &[&str] = &[TODOS_TABLE_DDL];

/// Apply the schema on `handle` inside a single transaction.
///
/// On error the transaction is left open; releasing the handle rolls it back.
pub async fn apply_schema(handle: &mut Handle) -> Result<(), SchemaError> {
    handle.begin().await.map_err(SchemaError::Apply)?;

    for statement in SCHEMA {
        handle.execute(statement).await.map_err(SchemaError::Apply)?;
    }

    handle.commit().await.map_err(SchemaError::Commit)?;

    tracing::info!("Database schema applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::{Connector, MemoryStore};
    use crate::storage::{ConnectionParams, StorageError};

    fn params() -> ConnectionParams {
        ConnectionParams {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }

    #[test]
    fn test_todos_ddl_is_idempotent_form() {
        let normalized = TODOS_TABLE_DDL.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(
            normalized,
            "CREATE TABLE IF NOT EXISTS todos ( id SERIAL PRIMARY KEY, task TEXT NOT NULL, completed BOOLEAN DEFAULT FALSE );"
        );
    }

    #[tokio::test]
    async fn test_apply_schema_creates_table() {
        let store = MemoryStore::new();
        let mut handle = Handle::new(store.connect(&params()).await.unwrap());

        apply_schema(&mut handle).await.unwrap();
        handle.release().await;

        assert!(store.has_table("todos"));
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_apply_schema_failure_leaves_nothing_behind() {
        let store = MemoryStore::new();
        store.fail_statements(1);
        let mut handle = Handle::new(store.connect(&params()).await.unwrap());

        let err = apply_schema(&mut handle).await.unwrap_err();
        assert!(matches!(err, SchemaError::Apply(StorageError::Statement(_))));
        assert!(handle.in_transaction());

        handle.release().await;
        assert!(!store.has_table("todos"));
        assert_eq!(store.open_sessions(), 0);
    }
}
