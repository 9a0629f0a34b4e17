//! Sweep Record Schema
//!
//! Column names and order are consumed by plotting tools; changing them
//! breaks every downstream reader.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sweepbench_core::{ConfigPoint, MetricRecord};

/// Header row of every sweep file, in order
pub const SWEEP_COLUMNS: [&str; 13] = [
    "timestamp",
    "sql_file",
    "n_users",
    "clients",
    "fanout",
    "duration_s",
    "run_index",
    "tps",
    "latency_ms",
    "latency_std_ms",
    "errors",
    "returncode",
    "cmd",
];

/// One persisted repetition. Field order matches [`SWEEP_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    /// Local write time, `YYYY-MM-DDTHH:MM:SS`
    pub timestamp: String,
    /// Workload script
    pub sql_file: String,
    /// User population
    pub n_users: u32,
    /// Client concurrency
    pub clients: u32,
    /// Fanout (empty for single-axis sweeps)
    #[serde(default)]
    pub fanout: Option<u32>,
    /// Run duration in seconds
    pub duration_s: u32,
    /// 1-based repetition index
    pub run_index: u32,
    /// Throughput (empty when not found in the output)
    pub tps: Option<f64>,
    /// Mean latency in ms (empty when not found)
    pub latency_ms: Option<f64>,
    /// Latency stddev in ms (empty when not found)
    #[serde(default)]
    pub latency_std_ms: Option<f64>,
    /// Cumulative failure count
    pub errors: u64,
    /// Benchmark exit status
    pub returncode: i32,
    /// Exact command line
    pub cmd: String,
}

/// Columns that stay fixed for a whole sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadColumns {
    /// Workload script as given on the command line
    pub sql_file: String,
    /// User population
    pub n_users: u32,
    /// Run duration in seconds
    pub duration_s: u32,
}

impl SweepRecord {
    /// Combine a parsed run with its coordinates, stamped with `at`.
    pub fn from_run(
        workload: &WorkloadColumns,
        point: ConfigPoint,
        run_index: u32,
        record: MetricRecord,
        at: &DateTime<Local>,
    ) -> Self {
        Self {
            timestamp: format_timestamp(at),
            sql_file: workload.sql_file.clone(),
            n_users: workload.n_users,
            clients: point.clients,
            fanout: point.fanout,
            duration_s: workload.duration_s,
            run_index,
            tps: record.metrics.throughput,
            latency_ms: record.metrics.latency_mean_ms,
            latency_std_ms: record.metrics.latency_stddev_ms,
            errors: record.metrics.errors,
            returncode: record.exit_code,
            cmd: record.command,
        }
    }

    /// Configuration point this row belongs to
    pub fn point(&self) -> ConfigPoint {
        ConfigPoint {
            clients: self.clients,
            fanout: self.fanout,
        }
    }
}

/// ISO-8601 local time with second precision
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sweepbench_core::Metrics;

    #[test]
    fn test_from_run_maps_every_column() {
        let at = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let workload = WorkloadColumns {
            sql_file: "timeline.sql".to_string(),
            n_users: 10_000,
            duration_s: 30,
        };
        let record = MetricRecord {
            metrics: Metrics {
                throughput: Some(828.7),
                latency_mean_ms: Some(9.6),
                latency_stddev_ms: None,
                errors: 3,
            },
            exit_code: 0,
            command: "pgbench -c 8".to_string(),
        };

        let row = SweepRecord::from_run(&workload, ConfigPoint::clients(8), 2, record, &at);

        assert_eq!(row.timestamp, "2026-03-14T09:26:53");
        assert_eq!(row.clients, 8);
        assert_eq!(row.fanout, None);
        assert_eq!(row.run_index, 2);
        assert_eq!(row.tps, Some(828.7));
        assert_eq!(row.latency_std_ms, None);
        assert_eq!(row.errors, 3);
        assert_eq!(row.point(), ConfigPoint::clients(8));
    }
}
