//! In-process backend.
//!
//! [`MemoryStore`] behaves like a tiny relational store: it understands
//! `CREATE TABLE IF NOT EXISTS`, keeps schema changes inside transactions
//! until commit, assigns serial ids, and counts open sessions. Faults can be
//! injected to reproduce a database that is still starting up:
//!
//! - [`MemoryStore::refuse_connections`]: the next `n` connects are refused
//! - [`MemoryStore::fail_statements`]: the next `n` statements fail
//! - [`MemoryStore::fail_commits`]: the next `n` commits fail
//!
//! Row operations are applied immediately, outside any open transaction.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use async_trait::async_trait;

use crate::storage::db::{Connector, Session};
use crate::storage::{ConnectionParams, StorageError, Todo};

/// Shared state behind every clone of a [`MemoryStore`].
#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeSet<String>,
    todos: Vec<Todo>,
    last_id: i64,
    open_sessions: usize,
    connect_attempts: u64,
    refuse_connections: u32,
    fail_statements: u32,
    fail_commits: u32,
    rollbacks: u64,
}

/// In-process store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_connections(&self, n: u32) {
        self.state().refuse_connections = n;
    }

    /// Fail the next `n` statements executed through any session.
    pub fn fail_statements(&self, n: u32) {
        self.state().fail_statements = n;
    }

    /// Fail the next `n` commits. The transaction stays open for rollback.
    pub fn fail_commits(&self, n: u32) {
        self.state().fail_commits = n;
    }

    /// Transactions rolled back so far.
    pub fn rollbacks(&self) -> u64 {
        self.state().rollbacks
    }

    /// Total connection attempts seen, refused ones included.
    pub fn connect_attempts(&self) -> u64 {
        self.state().connect_attempts
    }

    /// Sessions opened and not yet released.
    pub fn open_sessions(&self) -> usize {
        self.state().open_sessions
    }

    /// Whether `name` has been created and committed.
    pub fn has_table(&self, name: &str) -> bool {
        self.state().tables.contains(name)
    }

    /// Names of all committed tables.
    pub fn tables(&self) -> Vec<String> {
        self.state().tables.iter().cloned().collect()
    }
}

#[async_trait]
impl Connector for MemoryStore {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Session>, StorageError> {
        let mut state = self.state();
        state.connect_attempts += 1;

        if state.refuse_connections > 0 {
            state.refuse_connections -= 1;
            return Err(StorageError::ConnectionRefused(format!(
                "{}:{} is not accepting connections",
                params.host, params.port
            )));
        }

        state.open_sessions += 1;
        Ok(Box::new(MemorySession {
            store: self.clone(),
            pending: None,
            released: false,
        }))
    }
}

/// Extract the table name from `CREATE TABLE IF NOT EXISTS <name> ...`.
fn created_table(sql: &str) -> Option<String> {
    static CREATE_TABLE_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let regex = CREATE_TABLE_REGEX.get_or_init(|| {
        regex::Regex::new(r"(?i)^\s*CREATE\s+TABLE\s+IF\s+NOT\s+EXISTS\s+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("failed to compile create table regex")
    });

    regex
        .captures(sql)
        .map(|caps| caps[1].to_ascii_lowercase())
}

/// A session on a [`MemoryStore`].
struct MemorySession {
    store: MemoryStore,
    /// Tables created in the open transaction, if any.
    pending: Option<Vec<String>>,
    released: bool,
}

impl MemorySession {
    fn check_open(&self) -> Result<(), StorageError> {
        if self.released {
            Err(StorageError::Released)
        } else {
            Ok(())
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.pending = None;
            self.store.state().open_sessions -= 1;
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn begin(&mut self) -> Result<(), StorageError> {
        self.check_open()?;
        if self.pending.is_none() {
            self.pending = Some(Vec::new());
        }
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<(), StorageError> {
        self.check_open()?;
        let mut state = self.store.state();

        if state.fail_statements > 0 {
            state.fail_statements -= 1;
            return Err(StorageError::Statement(
                "the database system is starting up".to_string(),
            ));
        }

        let table = created_table(sql).ok_or_else(|| StorageError::Unsupported(sql.trim().to_string()))?;

        match self.pending.as_mut() {
            Some(pending) => pending.push(table),
            None => {
                state.tables.insert(table);
            }
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        self.check_open()?;
        if self.pending.is_none() {
            return Err(StorageError::NoTransaction);
        }

        let mut state = self.store.state();
        if state.fail_commits > 0 {
            state.fail_commits -= 1;
            return Err(StorageError::Statement(
                "could not commit: the database system is shutting down".to_string(),
            ));
        }

        if let Some(pending) = self.pending.take() {
            state.tables.extend(pending);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        self.check_open()?;
        self.pending.take().ok_or(StorageError::NoTransaction)?;
        self.store.state().rollbacks += 1;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), StorageError> {
        self.check_open()
    }

    async fn insert_todo(&mut self, task: &str) -> Result<Todo, StorageError> {
        self.check_open()?;
        let mut state = self.store.state();

        if !state.tables.contains("todos") {
            return Err(StorageError::MissingRelation("todos".to_string()));
        }

        state.last_id += 1;
        let todo = Todo {
            id: state.last_id,
            task: task.to_string(),
            completed: false,
        };
        state.todos.push(todo.clone());
        Ok(todo)
    }

    async fn list_todos(&mut self) -> Result<Vec<Todo>, StorageError> {
        self.check_open()?;
        let state = self.store.state();

        if !state.tables.contains("todos") {
            return Err(StorageError::MissingRelation("todos".to_string()));
        }

        let mut todos = state.todos.clone();
        todos.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(todos)
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.check_open()?;
        self.release();
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::TODOS_TABLE_DDL;

    fn params() -> ConnectionParams {
        ConnectionParams {
            host: "memory".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }

    #[test]
    fn test_created_table_parsing() {
        assert_eq!(created_table(TODOS_TABLE_DDL).as_deref(), Some("todos"));
        assert_eq!(
            created_table("create table if not exists Notes (id int)").as_deref(),
            Some("notes")
        );
        assert_eq!(created_table("CREATE TABLE todos (id int)"), None);
        assert_eq!(created_table("DROP TABLE todos"), None);
    }

    #[tokio::test]
    async fn test_refused_connections_are_counted() {
        let store = MemoryStore::new();
        store.refuse_connections(2);

        assert!(store.connect(&params()).await.is_err());
        assert!(store.connect(&params()).await.is_err());
        let session = store.connect(&params()).await.unwrap();

        assert_eq!(store.connect_attempts(), 3);
        assert_eq!(store.open_sessions(), 1);
        drop(session);
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_create_table_is_idempotent() {
        let store = MemoryStore::new();
        let mut session = store.connect(&params()).await.unwrap();

        session.execute(TODOS_TABLE_DDL).await.unwrap();
        session.execute(TODOS_TABLE_DDL).await.unwrap();

        assert_eq!(store.tables(), vec!["todos".to_string()]);
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let store = MemoryStore::new();
        let mut session = store.connect(&params()).await.unwrap();

        session.begin().await.unwrap();
        session.execute(TODOS_TABLE_DDL).await.unwrap();
        assert!(!store.has_table("todos"));
        session.rollback().await.unwrap();
        assert!(!store.has_table("todos"));

        session.begin().await.unwrap();
        session.execute(TODOS_TABLE_DDL).await.unwrap();
        session.commit().await.unwrap();
        assert!(store.has_table("todos"));

        assert!(matches!(
            session.commit().await,
            Err(StorageError::NoTransaction)
        ));
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_transaction_for_rollback() {
        let store = MemoryStore::new();
        store.fail_commits(1);
        let mut session = store.connect(&params()).await.unwrap();

        session.begin().await.unwrap();
        session.execute(TODOS_TABLE_DDL).await.unwrap();
        assert!(matches!(
            session.commit().await,
            Err(StorageError::Statement(_))
        ));
        assert!(!store.has_table("todos"));

        session.rollback().await.unwrap();
        assert_eq!(store.rollbacks(), 1);
        assert!(!store.has_table("todos"));
    }

    #[tokio::test]
    async fn test_unsupported_statement() {
        let store = MemoryStore::new();
        let mut session = store.connect(&params()).await.unwrap();

        let err = session.execute("DELETE FROM todos").await.unwrap_err();
        assert!(matches!(err, StorageError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_rows_require_table() {
        let store = MemoryStore::new();
        let mut session = store.connect(&params()).await.unwrap();

        let err = session.insert_todo("buy milk").await.unwrap_err();
        assert_eq!(err.to_string(), "relation \"todos\" does not exist");
        assert!(session.list_todos().await.is_err());
    }

    #[tokio::test]
    async fn test_serial_ids_and_descending_order() {
        let store = MemoryStore::new();
        let mut session = store.connect(&params()).await.unwrap();
        session.execute(TODOS_TABLE_DDL).await.unwrap();

        let first = session.insert_todo("buy milk").await.unwrap();
        let second = session.insert_todo("walk dog").await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert!(!first.completed);

        let todos = session.list_todos().await.unwrap();
        let ids: Vec<i64> = todos.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_calls() {
        let store = MemoryStore::new();
        let mut session = store.connect(&params()).await.unwrap();

        session.close().await.unwrap();
        assert_eq!(store.open_sessions(), 0);
        assert!(matches!(session.ping().await, Err(StorageError::Released)));

        // Dropping after close must not release twice.
        drop(session);
        assert_eq!(store.open_sessions(), 0);
    }
}
