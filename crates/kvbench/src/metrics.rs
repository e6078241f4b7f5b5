//! Fixed-bucket latency histogram.
//!
//! One histogram belongs to one measurement window, so plain counters are
//! enough.

use std::time::Duration;

/// Bucket upper bounds in microseconds.
const LATENCY_BUCKETS_US: &[u64] = &[
    1, 2, 5, 10, 20, 50, 100, 200, 500, // sub-millisecond
    1_000, 2_000, 5_000, 10_000, 20_000, 50_000, 100_000, 200_000, 500_000, // milliseconds
    1_000_000, 2_000_000, 5_000_000, 10_000_000, // seconds
];

/// Latency histogram with percentile support.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Bucket upper bounds in microseconds.
    buckets: &'static [u64],
    /// Observations per bucket (non-cumulative).
    counts: Vec<u64>,
    sum: u64,
    count: u64,
    max: u64,
}

impl Histogram {
    /// Create a histogram with the default latency buckets (1us to 10s).
    pub fn latency() -> Self {
        Self {
            buckets: LATENCY_BUCKETS_US,
            counts: vec![0; LATENCY_BUCKETS_US.len()],
            sum: 0,
            count: 0,
            max: 0,
        }
    }

    /// Record a value in microseconds.
    pub fn observe(&mut self, value_us: u64) {
        self.sum = self.sum.saturating_add(value_us);
        self.count += 1;
        self.max = self.max.max(value_us);

        let idx = self
            .buckets
            .iter()
            .position(|&boundary| value_us <= boundary)
            .unwrap_or(self.buckets.len() - 1);
        self.counts[idx] += 1;
    }

    /// Record an elapsed duration.
    pub fn observe_duration(&mut self, elapsed: Duration) {
        self.observe(elapsed.as_micros().min(u64::MAX as u128) as u64);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Average value, 0 when empty.
    pub fn avg(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        self.sum / self.count
    }

    /// Approximate percentile (e.g., 0.50 for P50, 0.99 for P99).
    ///
    /// Returns the upper boundary of the bucket containing the target rank.
    pub fn percentile(&self, p: f64) -> u64 {
        if self.count == 0 {
            return 0;
        }

        let target = ((self.count as f64 * p).ceil() as u64).max(1);
        let mut cumulative = 0u64;

        for (i, count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return self.buckets[i];
            }
        }

        *self.buckets.last().unwrap_or(&0)
    }

    pub fn p50(&self) -> u64 {
        self.percentile(0.50)
    }

    pub fn p99(&self) -> u64 {
        self.percentile(0.99)
    }

    /// Bucket boundaries paired with their counts.
    pub fn snapshot(&self) -> Vec<(u64, u64)> {
        self.buckets
            .iter()
            .copied()
            .zip(self.counts.iter().copied())
            .collect()
    }

    /// Summarize into the figures carried by a run result.
    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            avg_us: self.avg(),
            p50_us: self.p50(),
            p99_us: self.p99(),
            max_us: self.max(),
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::latency()
    }
}

/// Per-operation latency figures in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub avg_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}
