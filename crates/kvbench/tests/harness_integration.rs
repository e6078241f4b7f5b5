//! Integration tests for the benchmark runner and suite.

use std::collections::HashSet;
use std::time::Duration;

use kvbench::backends::MemoryStore;
use kvbench::{
    BenchConfig, DocumentStore, DocumentStoreConfig, Error, OutputFormat, Phase, Runner,
    SqliteStore, SqliteStoreConfig, Suite, Workload,
};

#[test]
fn test_memory_end_to_end() {
    let store = MemoryStore::new();
    let mut suite = Suite::new(BenchConfig::new(500).with_seed(42));
    suite.run_backend(&store).unwrap();

    let reporter = suite.into_reporter();
    assert_eq!(reporter.len(), 2);

    let insert = reporter.get("MemoryInsert").unwrap();
    let get = reporter.get("MemoryGet").unwrap();
    assert_eq!(insert.iterations, 500);
    assert_eq!(get.iterations, 500);
    assert_eq!(insert.errors, 0);
    assert_eq!(get.errors, 0);
    assert!(insert.elapsed > Duration::ZERO);
    assert!(get.elapsed > Duration::ZERO);
    assert!(insert.ops_per_sec() > 0.0);

    // 500 measured inserts, then 500 setup puts for the get dataset.
    let stats = store.stats();
    assert_eq!(stats.puts, 1000);
    assert_eq!(stats.gets, 500);
    assert_eq!(stats.provisions, 2);
    assert_eq!(stats.closes, 2);

    let table = reporter.render_all();
    assert!(table.contains("MemoryInsert"));
    assert!(table.contains("MemoryGet"));
}

#[test]
fn test_exact_operation_counts() {
    for n in [0u64, 1, 100] {
        let store = MemoryStore::new();
        let mut runner = Runner::new(BenchConfig::new(n));

        let insert = runner.run("Insert", &store, Workload::Insert).unwrap();
        assert_eq!(store.stats().puts, n);
        assert_eq!(insert.iterations, n);

        let get = runner.run("Get", &store, Workload::Get).unwrap();
        assert_eq!(store.stats().gets, n);
        assert_eq!(get.iterations, n);

        if n == 0 {
            assert_eq!(insert.ops_per_sec(), 0.0);
            assert_eq!(get.ops_per_sec(), 0.0);
        }
    }
}

#[test]
fn test_reads_stay_within_dataset() {
    let store = MemoryStore::new().record_keys();
    let config = BenchConfig::new(1000).with_dataset_size(64).with_seed(7);
    Runner::new(config)
        .run("Get", &store, Workload::Get)
        .unwrap();

    let stats = store.stats();
    assert_eq!(stats.requested_keys.len(), 1000);
    let requested: HashSet<_> = stats.requested_keys.iter().collect();
    assert!(requested.len() <= 64);
    for key in &requested {
        assert!(store.contains(key));
    }
}

#[test]
fn test_put_failure_yields_no_result() {
    let store = MemoryStore::new().fail_put_at(42);
    let mut suite = Suite::new(BenchConfig::new(100));
    let failure = suite.run_backend(&store).unwrap_err();

    assert_eq!(failure.attempted, 43);
    assert_eq!(failure.phase, Phase::Measuring);
    assert_eq!(store.stats().puts, 43);
    assert!(suite.reporter().get("MemoryInsert").is_none());
    assert!(failure.to_string().contains("MemoryInsert"));
}

#[test]
fn test_provision_failure_aborts_before_operations() {
    let store = MemoryStore::new().fail_provision();
    let mut runner = Runner::new(BenchConfig::new(100));
    let failure = runner.run("Get", &store, Workload::Get).unwrap_err();

    assert_eq!(failure.phase, Phase::Provisioning);
    assert!(matches!(failure.source, Error::Provision(_)));
    assert_eq!(runner.state(), Phase::Failed);

    let stats = store.stats();
    assert_eq!(stats.puts, 0);
    assert_eq!(stats.gets, 0);
    assert_eq!(stats.closes, 1);
}

#[test]
fn test_sqlite_end_to_end() {
    let store = SqliteStore::new(SqliteStoreConfig::in_memory());
    let mut suite = Suite::new(BenchConfig::new(200).with_seed(1));
    suite.run_backend(&store).unwrap();

    let reporter = suite.into_reporter();
    assert_eq!(reporter.get("SqliteInsert").unwrap().iterations, 200);
    assert_eq!(reporter.get("SqliteGet").unwrap().iterations, 200);
}

#[test]
fn test_sqlite_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(SqliteStoreConfig::new(dir.path().join("bench.db")));
    let mut suite = Suite::new(BenchConfig::new(100).with_measure_generation(false));
    suite.run_backend(&store).unwrap();
    assert_eq!(suite.reporter().len(), 2);
}

#[test]
fn test_document_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(DocumentStoreConfig::new(dir.path()).with_bucket("bench"));
    let mut suite = Suite::new(BenchConfig::new(200).with_seed(2));
    suite.run_backend(&store).unwrap();

    let reporter = suite.into_reporter();
    let json = reporter.render(OutputFormat::Json);
    let names: Vec<String> = json
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["name"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(names, vec!["DocumentStoreGet", "DocumentStoreInsert"]);
}

#[test]
fn test_document_store_temporary() {
    let store = DocumentStore::new(DocumentStoreConfig::temporary());
    let result = Runner::new(BenchConfig::new(50))
        .run("DocumentStoreInsert", &store, Workload::Insert)
        .unwrap();
    assert_eq!(result.iterations, 50);
}
