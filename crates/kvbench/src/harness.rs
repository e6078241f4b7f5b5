//! Benchmark runner.
//!
//! A run walks `Idle -> Connecting -> Provisioning -> PreparingDataset ->
//! Measuring -> Done`, or stops in `Failed`. Everything before `Measuring` is
//! untimed setup. The clock covers exactly N sequential operations.
//!
//! Which work lands inside the window depends on the workload:
//!
//! - `Get`: the dataset is built and written during setup; the window holds
//!   only reads, each of a key drawn uniformly (with replacement) from the
//!   dataset.
//! - `Insert` with `measure_generation`: each record is generated inside the
//!   window, right before it is written.
//! - `Insert` without it: the dataset is built during setup and consumed in
//!   order, each record once.

use std::fmt;
use std::time::Instant;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::alloc;
use crate::backends::{Backend, Connection};
use crate::config::{BenchConfig, FailurePolicy};
use crate::error::Error;
use crate::fixtures::{build_dataset_with, RecordGenerator, UserRecord};
use crate::metrics::Histogram;
use crate::report::RunResult;

/// Operation measured by a benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    Insert,
    Get,
}

impl Workload {
    /// Suffix appended to the backend name to label the benchmark.
    pub fn label(&self) -> &'static str {
        match self {
            Workload::Insert => "Insert",
            Workload::Get => "Get",
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Runner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting,
    Provisioning,
    PreparingDataset,
    Measuring,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::Provisioning => "provisioning",
            Phase::PreparingDataset => "preparing dataset",
            Phase::Measuring => "measuring",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A benchmark run that did not complete.
#[derive(Debug, Error)]
#[error("benchmark {benchmark} failed while {phase} after {attempted} measured operation(s): {source}")]
pub struct RunFailure {
    pub benchmark: String,
    /// Phase the run was in when it failed.
    pub phase: Phase,
    /// Measured operations attempted, including the failing one.
    pub attempted: u64,
    #[source]
    pub source: Error,
}

/// Drives benchmark runs against backends.
pub struct Runner {
    config: BenchConfig,
    state: Phase,
    generator: RecordGenerator,
    rng: StdRng,
}

impl Runner {
    pub fn new(config: BenchConfig) -> Self {
        let (generator, rng) = match config.seed {
            Some(seed) => (
                RecordGenerator::seeded(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (RecordGenerator::new(), StdRng::from_entropy()),
        };
        Self {
            config,
            state: Phase::Idle,
            generator,
            rng,
        }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Phase reached by the most recent run.
    pub fn state(&self) -> Phase {
        self.state
    }

    /// Run one benchmark named `name` against `backend`.
    ///
    /// The connection is closed on every path once it is open.
    pub fn run<B: Backend>(
        &mut self,
        name: &str,
        backend: &B,
        workload: Workload,
    ) -> Result<RunResult, RunFailure> {
        self.state = Phase::Connecting;
        tracing::info!(benchmark = name, backend = backend.name(), %workload, iterations = self.config.iterations, "starting benchmark");

        let mut conn = match backend.connect() {
            Ok(conn) => conn,
            Err(e) => return Err(self.fail(name, 0, e)),
        };

        let outcome = self.run_connected(name, backend, &mut conn, workload);

        if let Err(e) = conn.close() {
            tracing::warn!(benchmark = name, error = %e, "failed to close connection");
        }

        match outcome {
            Ok(result) => {
                self.state = Phase::Done;
                tracing::info!(benchmark = name, result = %result, "benchmark complete");
                Ok(result)
            }
            Err((attempted, e)) => Err(self.fail(name, attempted, e)),
        }
    }

    fn run_connected<B: Backend>(
        &mut self,
        name: &str,
        backend: &B,
        conn: &mut B::Conn,
        workload: Workload,
    ) -> Result<RunResult, (u64, Error)> {
        self.state = Phase::Provisioning;
        let schema = backend.schema();
        conn.provision(&schema).map_err(|e| (0, e))?;
        tracing::debug!(benchmark = name, namespace = %schema.namespace, "provisioned");

        self.state = Phase::PreparingDataset;
        let n = self.config.iterations;
        match workload {
            Workload::Get => {
                let dataset = self.prepare_dataset();
                if dataset.is_empty() && n > 0 {
                    return Err((
                        0,
                        Error::DatasetTooSmall {
                            requested: n,
                            available: 0,
                        },
                    ));
                }
                for record in &dataset {
                    conn.put(&record.id, record).map_err(|e| (0, e))?;
                }
                tracing::debug!(benchmark = name, records = dataset.len(), "dataset loaded");

                let keys = Uniform::new(0, dataset.len().max(1));
                let rng = &mut self.rng;
                self.state = Phase::Measuring;
                measure(name, n, self.config.failure_policy, |_| {
                    let record = &dataset[keys.sample(rng)];
                    conn.get(&record.id).map(|_| ())
                })
            }
            Workload::Insert if self.config.measure_generation => {
                let generator = &mut self.generator;
                self.state = Phase::Measuring;
                measure(name, n, self.config.failure_policy, |_| {
                    let record = generator.next_record();
                    conn.put(&record.id, &record)
                })
            }
            Workload::Insert => {
                let dataset = self.prepare_dataset();
                if (dataset.len() as u64) < n {
                    return Err((
                        0,
                        Error::DatasetTooSmall {
                            requested: n,
                            available: dataset.len(),
                        },
                    ));
                }
                let mut records = dataset.iter();
                self.state = Phase::Measuring;
                measure(name, n, self.config.failure_policy, |_| match records.next() {
                    Some(record) => conn.put(&record.id, record),
                    None => Err(Error::DatasetTooSmall {
                        requested: n,
                        available: dataset.len(),
                    }),
                })
            }
        }
    }

    fn prepare_dataset(&mut self) -> Vec<UserRecord> {
        build_dataset_with(&mut self.generator, self.config.effective_dataset_size())
    }

    fn fail(&mut self, name: &str, attempted: u64, source: Error) -> RunFailure {
        let phase = self.state;
        self.state = Phase::Failed;
        tracing::error!(benchmark = name, %phase, attempted, error = %source, "benchmark failed");
        RunFailure {
            benchmark: name.to_string(),
            phase,
            attempted,
            source,
        }
    }
}

/// Time `n` sequential calls of `op`.
///
/// The clock is read once per operation. Each operation's latency is the gap
/// since the previous read, so per-operation figures also absorb the
/// histogram update and loop overhead, and they add up to `elapsed`.
///
/// On failure under fail-fast, returns the number of attempted operations
/// along with the error.
fn measure<F>(
    name: &str,
    n: u64,
    policy: FailurePolicy,
    mut op: F,
) -> Result<RunResult, (u64, Error)>
where
    F: FnMut(u64) -> Result<(), Error>,
{
    let mut histogram = Histogram::latency();
    let mut errors = 0u64;

    let allocs_before = alloc::snapshot();
    let start = Instant::now();
    let mut last = start;
    for i in 0..n {
        let outcome = op(i);
        let now = Instant::now();
        histogram.observe_duration(now.duration_since(last));
        last = now;

        if let Err(e) = outcome {
            match policy {
                FailurePolicy::FailFast => return Err((i + 1, e)),
                FailurePolicy::RecordAndContinue => {
                    tracing::warn!(benchmark = name, iteration = i, error = %e, "operation failed");
                    errors += 1;
                }
            }
        }
    }
    let elapsed = last.duration_since(start);
    let allocs = match (allocs_before, alloc::snapshot()) {
        (Some(before), Some(after)) => Some(after.since(&before)),
        _ => None,
    };

    Ok(RunResult {
        name: name.to_string(),
        iterations: n,
        elapsed,
        latency: histogram.summary(),
        errors,
        allocs,
    })
}
