//! Document store backend.
//!
//! Records are JSON documents in a sled tree; the tree plays the role of the
//! bucket. Inserts are add-if-absent through compare-and-swap.

use std::path::PathBuf;

use sled::{Db, Tree};

use super::{Backend, Connection, SchemaSpec};
use crate::error::{Error, Result};
use crate::fixtures::UserRecord;

/// Default on-disk location of the document store.
pub const DEFAULT_PATH: &str = "./kvbench-data";

/// Default bucket name.
pub const DEFAULT_BUCKET: &str = "default";

/// Document store configuration.
#[derive(Debug, Clone)]
pub struct DocumentStoreConfig {
    /// Database directory. `None` opens a temporary database removed on close.
    pub path: Option<PathBuf>,

    /// Bucket holding the benchmark documents.
    pub bucket: String,

    /// Page cache size in bytes. `None` keeps the store's default.
    pub cache_capacity: Option<u64>,
}

impl DocumentStoreConfig {
    /// Create a configuration for a database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            bucket: DEFAULT_BUCKET.to_string(),
            cache_capacity: None,
        }
    }

    /// Create a configuration for a temporary database.
    pub fn temporary() -> Self {
        Self {
            path: None,
            ..Self::new(DEFAULT_PATH)
        }
    }

    /// Set the bucket name.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Set the page cache size.
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = Some(bytes);
        self
    }

    fn to_sled_config(&self) -> sled::Config {
        let mut config = sled::Config::new();
        config = match &self.path {
            Some(path) => config.path(path),
            None => config.temporary(true),
        };
        if let Some(bytes) = self.cache_capacity {
            config = config.cache_capacity(bytes);
        }
        config
    }
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PATH)
    }
}

/// Document store backend.
pub struct DocumentStore {
    config: DocumentStoreConfig,
}

impl DocumentStore {
    pub fn new(config: DocumentStoreConfig) -> Self {
        Self { config }
    }
}

impl Backend for DocumentStore {
    type Conn = DocumentConnection;

    fn name(&self) -> &str {
        "DocumentStore"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new(&self.config.bucket)
    }

    fn connect(&self) -> Result<DocumentConnection> {
        tracing::debug!(path = ?self.config.path, bucket = %self.config.bucket, "opening document store");
        let db = self
            .config
            .to_sled_config()
            .open()
            .map_err(|e| Error::Connection(e.to_string()))?;
        let bucket = db
            .open_tree(&self.config.bucket)
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(DocumentConnection { db, bucket })
    }
}

/// Open document store.
pub struct DocumentConnection {
    db: Db,
    bucket: Tree,
}

impl Connection for DocumentConnection {
    fn provision(&mut self, schema: &SchemaSpec) -> Result<()> {
        let existed = self
            .db
            .drop_tree(&schema.namespace)
            .map_err(|e| Error::Provision(e.to_string()))?;
        if existed {
            tracing::info!(bucket = %schema.namespace, "dropped existing bucket");
        }
        self.bucket = self
            .db
            .open_tree(&schema.namespace)
            .map_err(|e| Error::Provision(e.to_string()))?;
        Ok(())
    }

    fn put(&mut self, key: &str, record: &UserRecord) -> Result<()> {
        let doc = record.to_json()?;
        match self
            .bucket
            .compare_and_swap(key, None as Option<&[u8]>, Some(doc.into_bytes()))
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Error::DuplicateKey(key.to_string())),
            Err(e) => Err(Error::write(key, e)),
        }
    }

    fn get(&mut self, key: &str) -> Result<UserRecord> {
        let doc = self
            .bucket
            .get(key)
            .map_err(|e| Error::read(key, e))?
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(UserRecord::from_json(&doc)?)
    }

    fn close(self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }
}
