//! SQLite backend.
//!
//! Stores each record as a JSON value in a two-column table named
//! `<namespace>_<table>`.

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{params, OptionalExtension};

use super::{validate_identifier, Backend, Connection, SchemaSpec, DEFAULT_NAMESPACE};
use crate::error::{Error, Result};
use crate::fixtures::UserRecord;

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// SQLite backend configuration.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Database file, or `:memory:`.
    pub path: PathBuf,

    /// Prefix of the benchmark table.
    pub namespace: String,

    /// How long a locked database is retried before failing.
    pub busy_timeout: Option<Duration>,
}

impl SqliteStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            busy_timeout: None,
        }
    }

    /// Create a configuration for an in-memory database.
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    /// Set the table prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// SQLite backend.
pub struct SqliteStore {
    config: SqliteStoreConfig,
}

impl SqliteStore {
    pub fn new(config: SqliteStoreConfig) -> Self {
        Self { config }
    }
}

impl Backend for SqliteStore {
    type Conn = SqliteConnection;

    fn name(&self) -> &str {
        "Sqlite"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new(&self.config.namespace)
    }

    fn connect(&self) -> Result<SqliteConnection> {
        let conn = rusqlite::Connection::open(&self.config.path)
            .map_err(|e| Error::Connection(e.to_string()))?;
        if let Some(timeout) = self.config.busy_timeout {
            conn.busy_timeout(timeout)
                .map_err(|e| Error::Connection(e.to_string()))?;
        }
        let table = table_name(&self.schema())?;
        Ok(SqliteConnection { conn, table })
    }
}

/// Open SQLite database.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    table: String,
}

impl Connection for SqliteConnection {
    fn provision(&mut self, schema: &SchemaSpec) -> Result<()> {
        let table = table_name(schema).map_err(|e| Error::Provision(e.to_string()))?;
        self.conn
            .execute_batch(&format!(
                r#"
            DROP TABLE IF EXISTS {table};
            CREATE TABLE {table} (
                id TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#
            ))
            .map_err(|e| Error::Provision(e.to_string()))?;
        self.table = table;
        Ok(())
    }

    fn put(&mut self, key: &str, record: &UserRecord) -> Result<()> {
        let value = record.to_json()?;
        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "INSERT INTO {} (id, value) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
                self.table
            ))
            .map_err(|e| Error::write(key, e))?;
        let inserted = stmt
            .execute(params![key, value])
            .map_err(|e| Error::write(key, e))?;
        if inserted == 0 {
            return Err(Error::DuplicateKey(key.to_string()));
        }
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<UserRecord> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT value FROM {} WHERE id = ?1", self.table))
            .map_err(|e| Error::read(key, e))?;
        let value: String = stmt
            .query_row(params![key], |row| row.get(0))
            .optional()
            .map_err(|e| Error::read(key, e))?
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(UserRecord::from_json(value.as_bytes())?)
    }

    fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::Connection(e.to_string()))
    }
}

fn table_name(schema: &SchemaSpec) -> Result<String> {
    validate_identifier("namespace", &schema.namespace)?;
    validate_identifier("table", &schema.table)?;
    Ok(format!("{}_{}", schema.namespace, schema.table))
}
