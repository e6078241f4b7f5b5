//! Test data generation for benchmarks.
//!
//! Every record embeds a fresh random token in its email before the email is
//! hashed into the id, so ids stay unique even when indices repeat across runs
//! against a store that kept the previous run's data.

use serde::{Deserialize, Serialize};

use crate::identity::{deterministic_id, IdentityGenerator, RECORD_NAMESPACE};

/// User record stored by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserRecord {
    /// Encode the record as a JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a record from a JSON document.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// Stateful record producer.
///
/// Used directly when record generation belongs inside the timed window, and
/// by [`build_dataset_with`] when it does not.
pub struct RecordGenerator {
    identity: IdentityGenerator,
    next_index: u64,
}

impl RecordGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_identity(IdentityGenerator::new())
    }

    /// Create a generator with a reproducible token stream.
    pub fn seeded(seed: u64) -> Self {
        Self::with_identity(IdentityGenerator::seeded(seed))
    }

    fn with_identity(identity: IdentityGenerator) -> Self {
        Self {
            identity,
            next_index: 0,
        }
    }

    /// Number of records produced so far.
    pub fn produced(&self) -> u64 {
        self.next_index
    }

    /// Produce the next record.
    pub fn next_record(&mut self) -> UserRecord {
        let index = self.next_index;
        self.next_index += 1;

        let email = format!(
            "user{}{}@domain.com",
            index,
            self.identity.random_token()
        );
        let id = deterministic_id(&RECORD_NAMESPACE, &email);

        UserRecord {
            id,
            email,
            first_name: self.identity.random_token(),
            last_name: self.identity.random_token(),
        }
    }
}

impl Default for RecordGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for RecordGenerator {
    type Item = UserRecord;

    fn next(&mut self) -> Option<UserRecord> {
        Some(self.next_record())
    }
}

/// Build a fully materialized dataset of `count` records.
pub fn build_dataset(count: usize) -> Vec<UserRecord> {
    build_dataset_with(&mut RecordGenerator::new(), count)
}

/// Build a dataset from an existing generator.
pub fn build_dataset_with(generator: &mut RecordGenerator, count: usize) -> Vec<UserRecord> {
    let mut records = Vec::with_capacity(count);
    records.extend(generator.take(count));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn distinct_ids(records: &[UserRecord]) -> usize {
        records.iter().map(|r| r.id.as_str()).collect::<HashSet<_>>().len()
    }

    #[test]
    fn test_build_dataset_sizes() {
        for count in [0, 1, 1000] {
            let records = build_dataset(count);
            assert_eq!(records.len(), count);
            assert_eq!(distinct_ids(&records), count);
        }
    }

    #[test]
    fn test_record_shape() {
        let mut gen = RecordGenerator::seeded(1);
        let record = gen.next_record();

        assert!(record.email.starts_with("user0"));
        assert!(record.email.ends_with("@domain.com"));
        assert_eq!(record.id, deterministic_id(&RECORD_NAMESPACE, &record.email));
        assert_ne!(record.first_name, record.last_name);
    }

    #[test]
    fn test_generator_counts_and_indexes() {
        let mut gen = RecordGenerator::seeded(3);
        let records = build_dataset_with(&mut gen, 3);
        assert_eq!(gen.produced(), 3);
        assert!(records[2].email.starts_with("user2"));
        assert!(gen.next_record().email.starts_with("user3"));
    }

    #[test]
    fn test_seeded_dataset_is_reproducible() {
        let a = build_dataset_with(&mut RecordGenerator::seeded(42), 10);
        let b = build_dataset_with(&mut RecordGenerator::seeded(42), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_index_different_runs_differ() {
        // Two unseeded runs reuse index 0 but must not reuse the id.
        let a = build_dataset(1);
        let b = build_dataset(1);
        assert_ne!(a[0].id, b[0].id);
    }

    #[test]
    fn test_json_field_names() {
        let record = RecordGenerator::seeded(5).next_record();
        let json = record.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for field in ["id", "email", "first_name", "last_name"] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(UserRecord::from_json(json.as_bytes()).unwrap(), record);
    }
}
