//! Output Formatting
//!
//! Human-readable output for sweeps:
//! - One progress line per finished repetition
//! - The dry-run plan listing every command that would be executed
//! - Aggregate tables for `sweepbench aggregate`

use super::execution::SweepSummary;
use crate::config::SweepConfig;
use sweepbench_report::{AggregateReport, SweepRecord};

fn or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

/// `[fanout=F clients=C run=R] TPS=.. latency=.. ms stddev=.. ms errors=N [exit=X]`
pub fn format_progress_line(row: &SweepRecord) -> String {
    let mut line = format!(
        "[{} run={}] TPS={} latency={} ms stddev={} ms errors={}",
        row.point(),
        row.run_index,
        or_na(row.tps),
        or_na(row.latency_ms),
        or_na(row.latency_std_ms),
        row.errors
    );
    if row.returncode != 0 {
        line.push_str(&format!(" exit={}", row.returncode));
    }
    line
}

/// Every command a sweep would run, without running anything
pub fn format_plan(config: &SweepConfig) -> String {
    let plan = &config.plan;
    let mut output = String::new();

    output.push_str("SweepBench Plan:\n");
    for group in plan.groups() {
        if let Some(fanout) = group.fanout {
            output.push_str(&format!("├── fanout={}\n", fanout));
            if let Some(reset) = &config.reset {
                output.push_str(&format!("│   ├── reset: {}\n", reset.schema_command()));
                output.push_str(&format!(
                    "│   ├── load:  {}\n",
                    reset.load_command(plan.workload.n_users, fanout)
                ));
            }
        }
        for point in &group.points {
            output.push_str(&format!(
                "│   ├── [{}] x{} {}\n",
                point,
                plan.runs,
                config.bench.command_for(point)
            ));
        }
    }
    output.push_str(&format!(
        "{} points, {} runs planned.\n",
        plan.points().len(),
        plan.total_runs()
    ));
    output
}

/// One-line recap printed after a sweep
pub fn format_summary(summary: &SweepSummary) -> String {
    let mut line = format!(
        "{} runs recorded, {} failed, {} errors",
        summary.rows_written, summary.failed_runs, summary.total_errors
    );
    if summary.resets > 0 {
        line.push_str(&format!(", {} resets", summary.resets));
    }
    line
}

/// Format an aggregate report for terminal display
pub fn format_aggregate_human(report: &AggregateReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format!("SweepBench Aggregate (by {})\n", report.axis.as_str()));
    output.push_str(&"=".repeat(78));
    output.push('\n');

    output.push_str(&format!(
        "  {:>8}  {:>4}  {:>12}  {:>12}  {:>10}  {:>10}  {:>7}  {:>6}\n",
        report.axis.as_str(),
        "runs",
        "tps mean",
        "tps median",
        "tps std",
        "latency ms",
        "errors",
        "failed"
    ));
    output.push_str(&format!("  {}\n", "-".repeat(76)));

    let opt = |v: Option<f64>, precision: usize| {
        v.map_or_else(|| "n/a".to_string(), |v| format!("{:.*}", precision, v))
    };

    for group in &report.groups {
        let tps = group.tps.as_ref();
        output.push_str(&format!(
            "  {:>8}  {:>4}  {:>12}  {:>12}  {:>10}  {:>10}  {:>7}  {:>6}\n",
            group.value,
            group.runs,
            opt(tps.map(|s| s.mean), 2),
            opt(tps.map(|s| s.median), 2),
            opt(tps.map(|s| s.std_dev), 2),
            opt(group.latency_ms, 3),
            group.errors,
            group.failed_runs
        ));
    }

    output.push('\n');
    output.push_str(&format!(
        "{} rows, {} groups",
        report.total_rows,
        report.groups.len()
    ));
    if report.skipped_rows > 0 {
        output.push_str(&format!(
            ", {} rows without {} skipped",
            report.skipped_rows,
            report.axis.as_str()
        ));
    }
    output.push('\n');
    output
}
