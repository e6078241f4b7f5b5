//! Command-line arguments and their mapping onto benchmark configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use kvbench::backends::document::{DEFAULT_BUCKET, DEFAULT_PATH};
use kvbench::backends::sqlite::IN_MEMORY;
use kvbench::backends::wide_column::{
    DEFAULT_DATABASE, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PROTOCOL_VERSION, DEFAULT_USER,
};
use kvbench::backends::DEFAULT_NAMESPACE;
use kvbench::config::DEFAULT_ITERATIONS;
use kvbench::{
    BenchConfig, DocumentStoreConfig, FailurePolicy, OutputFormat, SqliteStoreConfig,
    WideColumnConfig,
};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// ASCII table
    Table,
    /// JSON lines
    Json,
    /// CSV
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Table => OutputFormat::Table,
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

/// Command-line arguments for the benchmark driver.
#[derive(Parser, Debug)]
#[command(name = "kvbench")]
#[command(version, about = "Insert and point-lookup benchmarks for storage backends", long_about = None)]
pub struct Args {
    /// Measured operations per benchmark.
    #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u64,

    /// Records prepared before measuring (defaults to the iteration count).
    #[arg(long)]
    pub dataset_size: Option<usize>,

    /// Generate insert records inside the timed window.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub measure_generation: bool,

    /// Count failed operations and keep going instead of aborting.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Seed for record tokens and read key selection.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Per-operation timeout in milliseconds. Unset waits forever.
    #[arg(long)]
    pub op_timeout_ms: Option<u64>,

    /// Output format.
    #[arg(long, default_value = "table", value_enum)]
    pub format: Format,

    /// Benchmark the document store.
    #[arg(long)]
    pub test_document_store: bool,

    /// Document store directory. Empty uses a temporary database.
    #[arg(long, default_value = DEFAULT_PATH)]
    pub document_store_path: String,

    /// Document store bucket.
    #[arg(long, default_value = DEFAULT_BUCKET)]
    pub document_store_bucket: String,

    /// Benchmark the wide-column store.
    #[arg(long)]
    pub test_wide_column: bool,

    /// Wide-column contact point. Repeatable, or comma-separated.
    #[arg(long = "wide-column-host", value_delimiter = ',', default_value = DEFAULT_HOST)]
    pub wide_column_hosts: Vec<String>,

    /// Wide-column port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub wide_column_port: u16,

    /// Wide-column keyspace.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub wide_column_keyspace: String,

    /// Wide-column wire protocol version.
    #[arg(long, default_value = DEFAULT_PROTOCOL_VERSION)]
    pub wide_column_protocol_version: String,

    /// Wide-column database.
    #[arg(long, default_value = DEFAULT_DATABASE)]
    pub wide_column_database: String,

    /// Wide-column user.
    #[arg(long, default_value = DEFAULT_USER)]
    pub wide_column_user: String,

    /// Wide-column password.
    #[arg(long)]
    pub wide_column_password: Option<String>,

    /// Benchmark SQLite.
    #[arg(long)]
    pub test_sqlite: bool,

    /// SQLite database file, or `:memory:`.
    #[arg(long, default_value = IN_MEMORY)]
    pub sqlite_path: PathBuf,

    /// Benchmark the in-process store.
    #[arg(long)]
    pub test_memory: bool,
}

impl Args {
    fn op_timeout(&self) -> Option<Duration> {
        self.op_timeout_ms.map(Duration::from_millis)
    }

    pub fn bench_config(&self) -> BenchConfig {
        let mut config = BenchConfig::new(self.iterations)
            .with_measure_generation(self.measure_generation);
        if let Some(size) = self.dataset_size {
            config = config.with_dataset_size(size);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if self.continue_on_error {
            config = config.with_failure_policy(FailurePolicy::RecordAndContinue);
        }
        config
    }

    pub fn document_store_config(&self) -> DocumentStoreConfig {
        let config = if self.document_store_path.is_empty() {
            DocumentStoreConfig::temporary()
        } else {
            DocumentStoreConfig::new(&self.document_store_path)
        };
        config.with_bucket(&self.document_store_bucket)
    }

    pub fn wide_column_config(&self) -> WideColumnConfig {
        let hosts = self
            .wide_column_hosts
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty());
        let config = WideColumnConfig::new(hosts)
            .with_port(self.wide_column_port)
            .with_keyspace(&self.wide_column_keyspace)
            .with_protocol_version(&self.wide_column_protocol_version)
            .with_database(&self.wide_column_database)
            .with_credentials(&self.wide_column_user, self.wide_column_password.clone());
        match self.op_timeout() {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }

    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        let config = SqliteStoreConfig::new(&self.sqlite_path);
        match self.op_timeout() {
            Some(timeout) => config.with_busy_timeout(timeout),
            None => config,
        }
    }

    /// Whether any backend was selected.
    pub fn any_backend(&self) -> bool {
        self.test_document_store || self.test_wide_column || self.test_sqlite || self.test_memory
    }
}
