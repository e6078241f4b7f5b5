//! Benchmark results and their rendering.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use comfy_table::{Cell, CellAlignment, Table};

use crate::alloc::AllocStats;
use crate::metrics::LatencySummary;

/// Outcome of one completed measurement window.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub name: String,
    /// Operations attempted in the window (N).
    pub iterations: u64,
    pub elapsed: Duration,
    pub latency: LatencySummary,
    /// Failed operations. Always 0 under fail-fast.
    pub errors: u64,
    /// Allocations made inside the window, when counted.
    pub allocs: Option<AllocStats>,
}

impl RunResult {
    /// Throughput in operations per second, 0 when undefined.
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if self.iterations == 0 || secs == 0.0 {
            return 0.0;
        }
        self.iterations as f64 / secs
    }

    /// Mean wall-clock nanoseconds per operation, 0 when N is 0.
    pub fn ns_per_op(&self) -> u64 {
        if self.iterations == 0 {
            return 0;
        }
        (self.elapsed.as_nanos() / self.iterations as u128) as u64
    }

    /// Mean allocations per operation, when counted.
    pub fn allocs_per_op(&self) -> Option<f64> {
        self.allocs.map(|a| a.per_op(self.iterations))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "iterations": self.iterations,
            "elapsed_ns": self.elapsed.as_nanos() as u64,
            "ops_per_sec": self.ops_per_sec(),
            "ns_per_op": self.ns_per_op(),
            "latency_us": {
                "avg": self.latency.avg_us,
                "p50": self.latency.p50_us,
                "p99": self.latency.p99_us,
                "max": self.latency.max_us,
            },
            "errors": self.errors,
            "allocations": self.allocs.map(|a| a.allocations),
            "allocated_bytes": self.allocs.map(|a| a.bytes),
        })
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10}\t{:>10} ns/op\t{:>12.1} ops/s",
            self.iterations,
            self.ns_per_op(),
            self.ops_per_sec()
        )?;
        if let Some(allocs) = self.allocs {
            write!(
                f,
                "\t{:>8.1} allocs/op\t{:>8} B/op",
                allocs.per_op(self.iterations),
                if self.iterations == 0 {
                    0
                } else {
                    allocs.bytes / self.iterations
                }
            )?;
        }
        Ok(())
    }
}

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// ASCII table
    #[default]
    Table,
    /// One JSON object per line
    Json,
    /// CSV with a header row
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

const COLUMNS: [&str; 10] = [
    "benchmark",
    "iterations",
    "elapsed",
    "ops/s",
    "ns/op",
    "p50 (us)",
    "p99 (us)",
    "max (us)",
    "allocs/op",
    "errors",
];

/// Named results of one invocation.
///
/// Names are unique: recording a name twice keeps the later result. Results
/// render sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    results: BTreeMap<String, RunResult>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `result` under `name`, replacing any earlier entry.
    pub fn record(&mut self, name: impl Into<String>, result: RunResult) {
        self.results.insert(name.into(), result);
    }

    pub fn get(&self, name: &str) -> Option<&RunResult> {
        self.results.get(name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RunResult)> {
        self.results.iter().map(|(name, result)| (name.as_str(), result))
    }

    /// Render every result as a table.
    pub fn render_all(&self) -> String {
        self.render(OutputFormat::Table)
    }

    /// Render every result in the given format.
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => self.render_table(),
            OutputFormat::Json => self.render_json_lines(),
            OutputFormat::Csv => self.render_csv(),
        }
    }

    fn render_table(&self) -> String {
        if self.results.is_empty() {
            return "No results".to_string();
        }

        let mut table = Table::new();
        table.set_header(COLUMNS.iter().map(Cell::new));
        for (name, result) in self.iter() {
            let mut row = vec![Cell::new(name)];
            row.extend(
                row_values(result)
                    .into_iter()
                    .map(|v| Cell::new(v).set_alignment(CellAlignment::Right)),
            );
            table.add_row(row);
        }

        format!("{}\n{} benchmark(s)", table, self.results.len())
    }

    fn render_json_lines(&self) -> String {
        self.results
            .values()
            .map(|result| result.to_json().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_csv(&self) -> String {
        let mut output = COLUMNS.join(",");
        output.push('\n');
        for (name, result) in self.iter() {
            let mut cells = vec![format!("\"{}\"", escape_csv(name))];
            cells.extend(row_values(result));
            output.push_str(&cells.join(","));
            output.push('\n');
        }
        output
    }
}

/// Every column after the name, formatted for display.
fn row_values(result: &RunResult) -> Vec<String> {
    vec![
        result.iterations.to_string(),
        format!("{:.3?}", result.elapsed),
        format!("{:.1}", result.ops_per_sec()),
        result.ns_per_op().to_string(),
        result.latency.p50_us.to_string(),
        result.latency.p99_us.to_string(),
        result.latency.max_us.to_string(),
        result
            .allocs_per_op()
            .map(|a| format!("{:.1}", a))
            .unwrap_or_else(|| "-".to_string()),
        result.errors.to_string(),
    ]
}

fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}
