//! In-process store.
//!
//! Serves as the zero-I/O baseline and as the fake backend for harness tests.
//! It counts every call, can be told to fail on connect, on provision, or on
//! the k-th put or get, and on request remembers every key read.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Backend, Connection, SchemaSpec};
use crate::error::{Error, Result};
use crate::fixtures::UserRecord;

/// Failures to inject, by operation.
#[derive(Debug, Clone, Default)]
struct FailurePlan {
    connect: bool,
    provision: bool,
    /// 0-based index of the put call that fails.
    put_at: Option<u64>,
    /// 0-based index of the get call that fails.
    get_at: Option<u64>,
}

/// Call counters observed by a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub connects: u64,
    pub provisions: u64,
    pub puts: u64,
    pub gets: u64,
    pub closes: u64,
    /// Keys passed to `get`, in call order. Empty unless key recording is on.
    pub requested_keys: Vec<String>,
}

#[derive(Default)]
struct Shared {
    records: Mutex<HashMap<String, UserRecord>>,
    connects: AtomicU64,
    provisions: AtomicU64,
    puts: AtomicU64,
    gets: AtomicU64,
    closes: AtomicU64,
    requested_keys: Mutex<Vec<String>>,
}

/// In-memory store backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    failures: FailurePlan,
    record_keys: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every connect attempt.
    pub fn fail_connect(mut self) -> Self {
        self.failures.connect = true;
        self
    }

    /// Fail every provision attempt.
    pub fn fail_provision(mut self) -> Self {
        self.failures.provision = true;
        self
    }

    /// Fail the put call with 0-based index `index`.
    pub fn fail_put_at(mut self, index: u64) -> Self {
        self.failures.put_at = Some(index);
        self
    }

    /// Fail the get call with 0-based index `index`.
    pub fn fail_get_at(mut self, index: u64) -> Self {
        self.failures.get_at = Some(index);
        self
    }

    /// Remember every key passed to `get`.
    ///
    /// Adds an allocation and a lock to each read, so leave it off when the
    /// store is the measured baseline.
    pub fn record_keys(mut self) -> Self {
        self.record_keys = true;
        self
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> MemoryStats {
        let shared = &self.shared;
        MemoryStats {
            connects: shared.connects.load(Ordering::Relaxed),
            provisions: shared.provisions.load(Ordering::Relaxed),
            puts: shared.puts.load(Ordering::Relaxed),
            gets: shared.gets.load(Ordering::Relaxed),
            closes: shared.closes.load(Ordering::Relaxed),
            requested_keys: shared.requested_keys.lock().clone(),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.shared.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a record is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.shared.records.lock().contains_key(key)
    }
}

impl Backend for MemoryStore {
    type Conn = MemoryConnection;

    fn name(&self) -> &str {
        "Memory"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::default()
    }

    fn connect(&self) -> Result<MemoryConnection> {
        self.shared.connects.fetch_add(1, Ordering::Relaxed);
        if self.failures.connect {
            return Err(Error::Connection("injected connect failure".to_string()));
        }
        Ok(MemoryConnection {
            shared: Arc::clone(&self.shared),
            failures: self.failures.clone(),
            record_keys: self.record_keys,
        })
    }
}

/// Connection to a [`MemoryStore`].
pub struct MemoryConnection {
    shared: Arc<Shared>,
    failures: FailurePlan,
    record_keys: bool,
}

impl Connection for MemoryConnection {
    fn provision(&mut self, _schema: &SchemaSpec) -> Result<()> {
        self.shared.provisions.fetch_add(1, Ordering::Relaxed);
        if self.failures.provision {
            return Err(Error::Provision("injected provision failure".to_string()));
        }
        self.shared.records.lock().clear();
        Ok(())
    }

    fn put(&mut self, key: &str, record: &UserRecord) -> Result<()> {
        let index = self.shared.puts.fetch_add(1, Ordering::Relaxed);
        if self.failures.put_at == Some(index) {
            return Err(Error::write(key, "injected put failure"));
        }

        let mut records = self.shared.records.lock();
        if records.contains_key(key) {
            return Err(Error::DuplicateKey(key.to_string()));
        }
        records.insert(key.to_string(), record.clone());
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<UserRecord> {
        let index = self.shared.gets.fetch_add(1, Ordering::Relaxed);
        if self.record_keys {
            self.shared.requested_keys.lock().push(key.to_string());
        }
        if self.failures.get_at == Some(index) {
            return Err(Error::read(key, "injected get failure"));
        }

        self.shared
            .records
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn close(self) -> Result<()> {
        self.shared.closes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::RecordGenerator;

    #[test]
    fn test_put_get_roundtrip() {
        let store = MemoryStore::new().record_keys();
        let mut conn = store.connect().unwrap();
        conn.provision(&SchemaSpec::default()).unwrap();

        let record = RecordGenerator::seeded(1).next_record();
        conn.put(&record.id, &record).unwrap();
        assert_eq!(conn.get(&record.id).unwrap(), record);
        conn.close().unwrap();

        let stats = store.stats();
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.gets, 1);
        assert_eq!(stats.closes, 1);
        assert_eq!(stats.requested_keys, vec![record.id.clone()]);
    }

    #[test]
    fn test_keys_not_recorded_by_default() {
        let store = MemoryStore::new();
        let mut conn = store.connect().unwrap();
        let record = RecordGenerator::seeded(5).next_record();
        conn.put(&record.id, &record).unwrap();
        for _ in 0..10 {
            conn.get(&record.id).unwrap();
        }

        let stats = store.stats();
        assert_eq!(stats.gets, 10);
        assert!(stats.requested_keys.is_empty());
    }

    #[test]
    fn test_duplicate_and_missing() {
        let store = MemoryStore::new();
        let mut conn = store.connect().unwrap();
        let record = RecordGenerator::seeded(2).next_record();

        conn.put(&record.id, &record).unwrap();
        assert!(matches!(
            conn.put(&record.id, &record),
            Err(Error::DuplicateKey(_))
        ));
        assert!(matches!(conn.get("missing"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_provision_clears() {
        let store = MemoryStore::new();
        let mut conn = store.connect().unwrap();
        let record = RecordGenerator::seeded(3).next_record();
        conn.put(&record.id, &record).unwrap();
        assert_eq!(store.len(), 1);

        conn.provision(&SchemaSpec::default()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_injected_failures() {
        assert!(matches!(
            MemoryStore::new().fail_connect().connect(),
            Err(Error::Connection(_))
        ));

        let store = MemoryStore::new().fail_provision();
        let mut conn = store.connect().unwrap();
        assert!(matches!(
            conn.provision(&SchemaSpec::default()),
            Err(Error::Provision(_))
        ));

        let store = MemoryStore::new().fail_put_at(1);
        let mut conn = store.connect().unwrap();
        let mut gen = RecordGenerator::seeded(4);
        let first = gen.next_record();
        let second = gen.next_record();
        conn.put(&first.id, &first).unwrap();
        assert!(matches!(
            conn.put(&second.id, &second),
            Err(Error::Write { .. })
        ));
        assert!(!store.contains(&second.id));
    }
}
