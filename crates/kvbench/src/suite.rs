//! Runs the insert and get benchmarks for a set of backends.

use crate::backends::Backend;
use crate::config::BenchConfig;
use crate::harness::{RunFailure, Runner, Workload};
use crate::report::Reporter;

/// Benchmark suite.
///
/// Each backend gets two benchmarks, `<name>Insert` then `<name>Get`, and
/// every benchmark re-provisions the store. The first failure stops the
/// suite.
pub struct Suite {
    runner: Runner,
    reporter: Reporter,
}

impl Suite {
    pub fn new(config: BenchConfig) -> Self {
        Self {
            runner: Runner::new(config),
            reporter: Reporter::new(),
        }
    }

    /// Run both benchmarks against `backend`.
    pub fn run_backend<B: Backend>(&mut self, backend: &B) -> Result<(), RunFailure> {
        for workload in [Workload::Insert, Workload::Get] {
            let name = format!("{}{}", backend.name(), workload.label());
            let result = self.runner.run(&name, backend, workload)?;
            self.reporter.record(name, result);
        }
        Ok(())
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn into_reporter(self) -> Reporter {
        self.reporter
    }
}
