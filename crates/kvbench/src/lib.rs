//! kvbench
//!
//! Measures insert throughput and random point-lookup throughput of storage
//! backends. Each benchmark provisions a fresh namespace, prepares a dataset
//! of synthetic user records, then times N sequential operations.
//!
//! # Modules
//!
//! - **identity**: name-based (v5) and random (v4) UUID strings
//! - **fixtures**: user records and dataset building
//! - **backends**: the `Backend`/`Connection` adapter traits and the sled,
//!   PostgreSQL, SQLite and in-memory stores
//! - **harness**: the runner state machine
//! - **report**: results and table/JSON/CSV rendering

pub mod alloc;
pub mod backends;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod identity;
pub mod metrics;
pub mod report;
pub mod suite;

pub use backends::{
    Backend, Connection, DocumentStore, DocumentStoreConfig, MemoryStore, SchemaSpec,
    SqliteStore, SqliteStoreConfig, WideColumnConfig, WideColumnStore,
};
pub use config::{BenchConfig, FailurePolicy};
pub use error::{Error, Result};
pub use fixtures::{build_dataset, RecordGenerator, UserRecord};
pub use harness::{Phase, RunFailure, Runner, Workload};
pub use report::{OutputFormat, Reporter, RunResult};
pub use suite::Suite;
