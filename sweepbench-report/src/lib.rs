#![warn(missing_docs)]
//! SweepBench Report - Persistence and Aggregation
//!
//! - CSV sink: one row per repetition, flushed as it is written
//! - CSV reader for previously written sweeps
//! - Aggregation of repetitions per axis value
//! - JSON / CSV output of aggregate reports

mod aggregate;
mod csv;
mod json;
mod record;

pub use aggregate::{AggregateReport, AxisGroup, AxisKind, aggregate};
pub use self::csv::{
    CsvSink, SinkError, default_sink_path, generate_csv_report, read_records,
    read_records_from_path,
};
pub use json::generate_json_report;
pub use record::{SWEEP_COLUMNS, SweepRecord, WorkloadColumns, format_timestamp};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// CSV for spreadsheets and plotting tools
    Csv,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
