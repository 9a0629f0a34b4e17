#![warn(missing_docs)]
//! SweepBench Core - Sweep Domain Model
//!
//! This crate provides the pieces every sweep is built from:
//! - Configuration points and the records produced for each repetition
//! - `ExtractionProfile` for turning benchmark output into typed metrics
//! - Command construction for the benchmark and reset/load scripts
//! - The `ProcessRunner` capability used to execute external commands

mod command;
mod extract;
mod runner;

pub use command::{BenchTarget, CommandSpec, ResetTarget};
pub use extract::{
    ERRORS_PATTERN, ExtractError, ExtractOverrides, ExtractionProfile, LATENCY_MEAN_PATTERN,
    LATENCY_STDDEV_PATTERN, MatchMode, MetricKind, MetricRule, Metrics, THROUGHPUT_PATTERN,
};
pub use runner::{ProcessRunner, RunOutput, RunnerError, invoke};

use serde::{Deserialize, Serialize};

/// One combination of axis values in a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigPoint {
    /// Number of concurrent benchmark clients
    pub clients: u32,
    /// Secondary workload parameter (relationships per entity), two-axis sweeps only
    pub fanout: Option<u32>,
}

impl ConfigPoint {
    /// Point on the single-axis client sweep
    pub fn clients(clients: u32) -> Self {
        Self {
            clients,
            fanout: None,
        }
    }

    /// Point on the two-axis fanout sweep
    pub fn with_fanout(clients: u32, fanout: u32) -> Self {
        Self {
            clients,
            fanout: Some(fanout),
        }
    }
}

impl std::fmt::Display for ConfigPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fanout {
            Some(fanout) => write!(f, "fanout={} clients={}", fanout, self.clients),
            None => write!(f, "clients={}", self.clients),
        }
    }
}

/// Raw outcome of one external invocation.
///
/// Only lives until the output has been run through an extraction profile.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Merged stdout and stderr
    pub output: String,
    /// Process exit status (0 = success)
    pub exit_code: i32,
    /// Exact command line used
    pub command: String,
}

impl RunResult {
    /// Whether the process exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Parse the captured output and drop it, keeping only the command line.
    pub fn into_record(self, profile: &ExtractionProfile) -> MetricRecord {
        MetricRecord {
            metrics: profile.extract(&self.output),
            exit_code: self.exit_code,
            command: self.command,
        }
    }
}

/// Typed result of parsing one run.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Extracted metrics
    pub metrics: Metrics,
    /// Process exit status (0 = success)
    pub exit_code: i32,
    /// Exact command line used
    pub command: String,
}
