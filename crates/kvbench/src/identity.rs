//! Record identity generation.
//!
//! Ids are name-based (UUID v5) so the same input always maps to the same
//! key. Filler fields and uniqueness salts come from random tokens (UUID v4
//! layout: 122 random bits with version and variant bits fixed).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::{Builder, Uuid};

/// Namespace used for record ids.
pub const RECORD_NAMESPACE: Uuid = Uuid::NAMESPACE_OID;

/// Derive a stable id from a namespace and an input string.
pub fn deterministic_id(namespace: &Uuid, input: &str) -> String {
    Uuid::new_v5(namespace, input.as_bytes()).to_string()
}

/// Source of random tokens.
///
/// Seeded from OS entropy by default. A seeded generator replays the same
/// token stream on every run, which collides against a persistent store that
/// still holds the previous run's keys.
pub struct IdentityGenerator {
    rng: StdRng,
}

impl IdentityGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a generator with a reproducible token stream.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce a fresh random token.
    pub fn random_token(&mut self) -> String {
        Builder::from_random_bytes(self.rng.gen()).into_uuid().to_string()
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}
