//! PostgreSQL backend implementation using sqlx.
//!
//! Each session is a dedicated `PgConnection`; nothing is pooled.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Row};

use crate::storage::db::{Connector, Session};
use crate::storage::schema::{INSERT_TODO_SQL, LIST_TODOS_SQL};
use crate::storage::{ConnectionParams, StorageError, Todo};

/// Application name reported to the server.
const APPLICATION_NAME: &str = "todo-service";

/// Opens PostgreSQL sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

impl PgConnector {
    /// Create a new connector.
    pub fn new() -> Self {
        Self
    }
}

/// Translate connection parameters into sqlx connect options.
fn connect_options(params: &ConnectionParams) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .database(&params.database)
        .username(&params.user)
        .password(&params.password)
        .application_name(APPLICATION_NAME)
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Session>, StorageError> {
        let conn = PgConnection::connect_with(&connect_options(params)).await?;
        Ok(Box::new(PgSession { conn: Some(conn) }))
    }
}

/// A single PostgreSQL connection.
struct PgSession {
    conn: Option<PgConnection>,
}

impl PgSession {
    fn conn(&mut self) -> Result<&mut PgConnection, StorageError> {
        self.conn.as_mut().ok_or(StorageError::Released)
    }
}

fn todo_from_row(row: &sqlx::postgres::PgRow) -> Result<Todo, StorageError> {
    let id: i32 = row.try_get("id")?;
    let completed: Option<bool> = row.try_get("completed")?;
    Ok(Todo {
        id: i64::from(id),
        task: row.try_get("task")?,
        completed: completed.unwrap_or(false),
    })
}

#[async_trait]
impl Session for PgSession {
    async fn begin(&mut self) -> Result<(), StorageError> {
        sqlx::Executor::execute(self.conn()?, sqlx::raw_sql("BEGIN")).await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<(), StorageError> {
        sqlx::Executor::execute(self.conn()?, sqlx::raw_sql(sql)).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        sqlx::Executor::execute(self.conn()?, sqlx::raw_sql("COMMIT")).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        sqlx::Executor::execute(self.conn()?, sqlx::raw_sql("ROLLBACK")).await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), StorageError> {
        self.conn()?.ping().await?;
        Ok(())
    }

    async fn insert_todo(&mut self, task: &str) -> Result<Todo, StorageError> {
        let row = sqlx::query(INSERT_TODO_SQL)
            .bind(task)
            .fetch_one(self.conn()?)
            .await?;
        todo_from_row(&row)
    }

    async fn list_todos(&mut self) -> Result<Vec<Todo>, StorageError> {
        let rows = sqlx::query(LIST_TODOS_SQL).fetch_all(self.conn()?).await?;
        rows.iter().map(todo_from_row).collect()
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}
