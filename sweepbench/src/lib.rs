#![warn(missing_docs)]
//! # SweepBench
//!
//! Parameter-sweep harness for an external load generator (pgbench).
//!
//! SweepBench enumerates a grid of configuration points, runs the benchmark
//! once per point and repetition, extracts throughput, latency and failure
//! counts from its text output, and appends one CSV row per run:
//! - **Client sweep**: one workload script across increasing client counts
//! - **Fanout sweep**: fanout x clients, resetting and reloading the data set
//!   once per fanout value
//! - **Crash-safe output**: every row is flushed as soon as its run finishes
//! - **Aggregation**: per-axis averages over repetitions for plotting
//!
//! ## Library use
//!
//! ```ignore
//! use sweepbench::{CsvSink, SweepDriver, SystemRunner};
//!
//! let mut sink = CsvSink::create("results.csv".as_ref())?;
//! let summary = SweepDriver::new(&SystemRunner, &config).run(&config.plan, &mut sink)?;
//! println!("{} rows", summary.rows_written);
//! ```

// Re-export core types
pub use sweepbench_core::{
    BenchTarget, CommandSpec, ConfigPoint, ExtractError, ExtractOverrides, ExtractionProfile,
    MatchMode, MetricKind, MetricRecord, MetricRule, Metrics, ProcessRunner, ResetTarget,
    RunOutput, RunResult, RunnerError, invoke,
};

// Re-export report types
pub use sweepbench_report::{
    AggregateReport, AxisGroup, AxisKind, CsvSink, OutputFormat, SWEEP_COLUMNS, SinkError,
    SweepRecord, WorkloadColumns, aggregate, read_records, read_records_from_path,
};

// Re-export stats
pub use sweepbench_stats::{SummaryStatistics, compute_summary};

// Re-export the driver
pub use sweepbench_cli::{
    ResetStep, SinkTarget, SweepConfig, SweepDriver, SweepError, SweepFileConfig, SweepPlan,
    SweepSummary, SystemRunner,
};

/// Run the SweepBench CLI.
///
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     sweepbench::run()
/// }
/// ```
pub use sweepbench_cli::run;
