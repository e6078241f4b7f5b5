//! kvbench command-line driver
//!
//! Runs the insert and get benchmarks against the selected backends and prints
//! the results.

mod config;

use clap::{CommandFactory, Parser};
use config::Args;
use kvbench::alloc::CountingAllocator;
use kvbench::{DocumentStore, MemoryStore, SqliteStore, Suite, WideColumnStore};
use mimalloc::MiMalloc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: CountingAllocator<MiMalloc> = CountingAllocator::new(MiMalloc);

/// Log filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str = "kvbench=info";

fn main() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(log_filter(directives.as_deref()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Bare invocation: show usage, then carry on with the defaults.
    if std::env::args_os().len() <= 1 {
        eprintln!("{}", Args::command().render_help());
    }

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Build the log filter from `RUST_LOG`-style directives, falling back to
/// [`DEFAULT_LOG_FILTER`].
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if !args.any_backend() {
        tracing::warn!("no backend selected");
    }

    let mut suite = Suite::new(args.bench_config());

    if args.test_document_store {
        let config = args.document_store_config();
        tracing::info!(path = ?config.path, bucket = %config.bucket, "benchmarking document store");
        suite.run_backend(&DocumentStore::new(config))?;
    }

    if args.test_wide_column {
        let config = args.wide_column_config();
        tracing::info!(hosts = %config.hosts_display(), port = config.port, keyspace = %config.keyspace, "benchmarking wide-column store");
        suite.run_backend(&WideColumnStore::new(config))?;
    }

    if args.test_sqlite {
        let config = args.sqlite_config();
        tracing::info!(path = %config.path.display(), "benchmarking sqlite");
        suite.run_backend(&SqliteStore::new(config))?;
    }

    if args.test_memory {
        suite.run_backend(&MemoryStore::new())?;
    }

    println!("{}", suite.reporter().render(args.format.into()));
    println!("Done");
    Ok(())
}
