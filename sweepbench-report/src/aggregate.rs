//! Aggregation Over Repetitions
//!
//! Groups sweep rows by one axis and averages the repetitions of each axis
//! value. Absent measurements are left out of every statistic; a group where
//! nothing was measured reports the statistic as absent instead of zero.

use crate::record::SweepRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sweepbench_stats::{SummaryStatistics, compute_summary, mean_of};

/// Axis to group rows by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    /// Client concurrency
    Clients,
    /// Fanout
    Fanout,
}

impl AxisKind {
    /// Column name of the axis
    pub fn as_str(self) -> &'static str {
        match self {
            AxisKind::Clients => "clients",
            AxisKind::Fanout => "fanout",
        }
    }

    fn value_of(self, record: &SweepRecord) -> Option<u32> {
        match self {
            AxisKind::Clients => Some(record.clients),
            AxisKind::Fanout => record.fanout,
        }
    }
}

impl std::str::FromStr for AxisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clients" => Ok(AxisKind::Clients),
            "fanout" => Ok(AxisKind::Fanout),
            other => Err(format!("Unknown axis: {}", other)),
        }
    }
}

/// Aggregated repetitions for one axis value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisGroup {
    /// Axis value
    pub value: u32,
    /// Rows in this group
    pub runs: usize,
    /// Throughput statistics over runs that reported one
    pub tps: Option<SummaryStatistics>,
    /// Mean of reported latencies (ms)
    pub latency_ms: Option<f64>,
    /// Mean of reported latency stddevs (ms)
    pub latency_std_ms: Option<f64>,
    /// Errors summed over runs
    pub errors: u64,
    /// Runs with a nonzero exit status
    pub failed_runs: usize,
}

/// Aggregate view of a whole sweep file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Grouping axis
    pub axis: AxisKind,
    /// Groups in ascending axis order
    pub groups: Vec<AxisGroup>,
    /// Rows read
    pub total_rows: usize,
    /// Rows without a value on the grouping axis
    pub skipped_rows: usize,
}

#[derive(Default)]
struct GroupAccumulator {
    runs: usize,
    tps: Vec<f64>,
    latency: Vec<f64>,
    latency_std: Vec<f64>,
    errors: u64,
    failed_runs: usize,
}

/// Group `records` by `axis` and summarise each group
pub fn aggregate(records: &[SweepRecord], axis: AxisKind) -> AggregateReport {
    let mut groups: BTreeMap<u32, GroupAccumulator> = BTreeMap::new();
    let mut skipped_rows = 0;

    for record in records {
        let Some(value) = axis.value_of(record) else {
            skipped_rows += 1;
            continue;
        };

        let acc = groups.entry(value).or_default();
        acc.runs += 1;
        acc.tps.extend(record.tps);
        acc.latency.extend(record.latency_ms);
        acc.latency_std.extend(record.latency_std_ms);
        acc.errors = acc.errors.saturating_add(record.errors);
        if record.returncode != 0 {
            acc.failed_runs += 1;
        }
    }

    let groups = groups
        .into_iter()
        .map(|(value, acc)| AxisGroup {
            value,
            runs: acc.runs,
            tps: compute_summary(&acc.tps),
            latency_ms: mean_of(&acc.latency),
            latency_std_ms: mean_of(&acc.latency_std),
            errors: acc.errors,
            failed_runs: acc.failed_runs,
        })
        .collect();

    AggregateReport {
        axis,
        groups,
        total_rows: records.len(),
        skipped_rows,
    }
}
