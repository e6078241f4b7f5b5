//! Store backends for comparison benchmarks.
//!
//! Every store is reached through the same two traits so the runner can time
//! any of them the same way. A [`Backend`] holds endpoint and credentials and
//! opens a [`Connection`]. The connection provisions the target namespace and
//! serves single-record puts and gets.

pub mod document;
pub mod memory;
pub mod sqlite;
pub mod wide_column;

pub use document::{DocumentStore, DocumentStoreConfig};
pub use memory::{MemoryStats, MemoryStore};
pub use sqlite::{SqliteStore, SqliteStoreConfig};
pub use wide_column::{WideColumnConfig, WideColumnStore};

use crate::error::{Error, Result};
use crate::fixtures::UserRecord;

/// Default namespace (bucket or keyspace).
pub const DEFAULT_NAMESPACE: &str = "benchtest";

/// Default table holding benchmark records.
pub const DEFAULT_TABLE: &str = "kvbench";

/// Target of provisioning: a namespace and the table inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSpec {
    /// Bucket, keyspace or schema name.
    pub namespace: String,
    /// Table name. Stores without tables ignore it.
    pub table: String,
}

impl SchemaSpec {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Set the table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

impl Default for SchemaSpec {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// A benchmarkable store.
pub trait Backend {
    type Conn: Connection;

    /// Short name used to label benchmarks (e.g. `DocumentStore`).
    fn name(&self) -> &str;

    /// Namespace this backend provisions before a run.
    fn schema(&self) -> SchemaSpec;

    /// Open the single connection a benchmark run uses.
    fn connect(&self) -> Result<Self::Conn>;
}

/// An open connection to a store.
pub trait Connection {
    /// Drop and recreate the namespace described by `schema`.
    ///
    /// Destroys any data already stored there.
    fn provision(&mut self, schema: &SchemaSpec) -> Result<()>;

    /// Add a record under `key`. Fails with [`Error::DuplicateKey`] if the key exists.
    fn put(&mut self, key: &str, record: &UserRecord) -> Result<()>;

    /// Fetch the record under `key`. Fails with [`Error::NotFound`] if absent.
    fn get(&mut self, key: &str) -> Result<UserRecord>;

    /// Release the connection.
    fn close(self) -> Result<()>;
}

/// Check that a name can be spliced into DDL as a bare identifier.
pub(crate) fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "invalid {} name {:?}: expected [A-Za-z_][A-Za-z0-9_]*",
            kind, name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_spec_defaults() {
        let schema = SchemaSpec::default();
        assert_eq!(schema.namespace, DEFAULT_NAMESPACE);
        assert_eq!(schema.table, DEFAULT_TABLE);

        let schema = SchemaSpec::new("ks").with_table("users");
        assert_eq!(schema.namespace, "ks");
        assert_eq!(schema.table, "users");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("keyspace", "benchtest").is_ok());
        assert!(validate_identifier("keyspace", "_bench_2").is_ok());
        assert!(validate_identifier("keyspace", "").is_err());
        assert!(validate_identifier("keyspace", "2bench").is_err());
        assert!(validate_identifier("keyspace", "bench; DROP").is_err());
        assert!(validate_identifier("keyspace", "bench-test").is_err());
    }
}
