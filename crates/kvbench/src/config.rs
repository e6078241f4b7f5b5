//! Benchmark run configuration.

/// Default number of measured operations per benchmark.
pub const DEFAULT_ITERATIONS: u64 = 10_000;

/// What to do when a measured operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the run on the first failure and report no result.
    #[default]
    FailFast,
    /// Count failures into the result and keep going.
    ///
    /// Timings from such runs include failed calls and are not comparable
    /// with clean runs.
    RecordAndContinue,
}

/// Settings shared by every benchmark in a suite.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of measured operations (N).
    pub iterations: u64,

    /// Size of the prepared dataset. `None` sizes it to `iterations`.
    pub dataset_size: Option<usize>,

    /// Generate insert records inside the timed window.
    ///
    /// When set, id generation cost is part of the measured insert cost.
    /// When cleared, inserts consume a dataset built during setup.
    pub measure_generation: bool,

    pub failure_policy: FailurePolicy,

    /// Seed for record tokens and read key selection. `None` uses OS entropy.
    pub seed: Option<u64>,
}

impl BenchConfig {
    /// Create a configuration running `iterations` operations per benchmark.
    pub fn new(iterations: u64) -> Self {
        Self {
            iterations,
            dataset_size: None,
            measure_generation: true,
            failure_policy: FailurePolicy::FailFast,
            seed: None,
        }
    }

    /// Set an explicit dataset size.
    pub fn with_dataset_size(mut self, size: usize) -> Self {
        self.dataset_size = Some(size);
        self
    }

    /// Choose whether insert record generation is measured.
    pub fn with_measure_generation(mut self, measure: bool) -> Self {
        self.measure_generation = measure;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Use a fixed seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of records to prepare before measuring.
    pub fn effective_dataset_size(&self) -> usize {
        self.dataset_size
            .unwrap_or_else(|| usize::try_from(self.iterations).unwrap_or(usize::MAX))
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.iterations, DEFAULT_ITERATIONS);
        assert!(config.measure_generation);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.effective_dataset_size(), DEFAULT_ITERATIONS as usize);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = BenchConfig::new(100)
            .with_dataset_size(50)
            .with_measure_generation(false)
            .with_failure_policy(FailurePolicy::RecordAndContinue)
            .with_seed(9);

        assert_eq!(config.iterations, 100);
        assert_eq!(config.effective_dataset_size(), 50);
        assert!(!config.measure_generation);
        assert_eq!(config.failure_policy, FailurePolicy::RecordAndContinue);
        assert_eq!(config.seed, Some(9));
    }
}
