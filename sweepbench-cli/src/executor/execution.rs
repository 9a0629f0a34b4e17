//! Sweep Execution
//!
//! Runs every repetition of every configuration point strictly one after
//! another. Rows are appended as soon as a run completes, so an interrupted
//! sweep keeps everything measured so far.
//!
//! ## Failure Policy
//!
//! - A benchmark run that exits nonzero is recorded like any other run.
//! - A reset or load step that exits nonzero aborts the sweep before any row
//!   is written for that fanout value.
//! - A command that cannot be spawned at all aborts the sweep.

use super::formatting::format_progress_line;
use crate::config::SweepConfig;
use crate::planner::SweepPlan;
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use sweepbench_core::{
    BenchTarget, ExtractionProfile, ProcessRunner, ResetTarget, RunnerError, invoke,
};
use sweepbench_report::{CsvSink, SinkError, SweepRecord};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Step of the reset/load precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    /// Drop and recreate the schema
    Schema,
    /// Load the data set
    Load,
}

impl std::fmt::Display for ResetStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetStep::Schema => f.write_str("Schema reset"),
            ResetStep::Load => f.write_str("Data load"),
        }
    }
}

/// Errors that abort a sweep
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("{step} for fanout={fanout} failed with exit status {exit_code}: {command}")]
    Precondition {
        step: ResetStep,
        fanout: u32,
        exit_code: i32,
        command: String,
    },

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Empty {0} list: nothing to run")]
    EmptyAxis(&'static str),

    #[error("Runs must be at least 1")]
    ZeroRuns,
}

/// Totals for a finished sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Rows appended to the sink
    pub rows_written: usize,
    /// Runs that exited nonzero
    pub failed_runs: usize,
    /// Errors summed over all runs
    pub total_errors: u64,
    /// Reset/load cycles performed
    pub resets: usize,
}

/// Executes a sweep plan against a process runner
pub struct SweepDriver<'a, R: ProcessRunner + ?Sized> {
    runner: &'a R,
    bench: &'a BenchTarget,
    reset: Option<&'a ResetTarget>,
    profile: &'a ExtractionProfile,
    show_progress: bool,
}

impl<'a, R: ProcessRunner + ?Sized> SweepDriver<'a, R> {
    /// Driver for the targets of `config`, progress output disabled
    pub fn new(runner: &'a R, config: &'a SweepConfig) -> Self {
        Self {
            runner,
            bench: &config.bench,
            reset: config.reset.as_ref(),
            profile: &config.profile,
            show_progress: false,
        }
    }

    /// Print a progress bar and one line per repetition
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run every point of `plan` and append one row per repetition to `sink`
    pub fn run<W: Write>(
        &self,
        plan: &SweepPlan,
        sink: &mut CsvSink<W>,
    ) -> Result<SweepSummary, SweepError> {
        let pb = self.progress_bar(plan.total_runs());
        let mut summary = SweepSummary::default();

        info!(
            points = plan.points().len(),
            runs = plan.runs,
            total = plan.total_runs(),
            "starting sweep"
        );
        for rule in self.profile.rules() {
            debug!(
                metric = %rule.metric(),
                mode = ?rule.mode(),
                pattern = rule.pattern(),
                "extraction rule"
            );
        }

        for group in plan.groups() {
            if let (Some(fanout), Some(reset)) = (group.fanout, self.reset) {
                pb.set_message(format!("reset fanout={}", fanout));
                self.reset_and_load(reset, plan.workload.n_users, fanout)?;
                summary.resets += 1;
            }

            for point in group.points {
                for run_index in 1..=plan.runs {
                    pb.set_message(format!("{} run={}", point, run_index));

                    let command = self.bench.command_for(&point);
                    debug!(%point, run = run_index, command = %command, "starting benchmark run");

                    let result = invoke(self.runner, &command)?;
                    if !result.success() {
                        warn!(
                            %point,
                            run = run_index,
                            exit_code = result.exit_code,
                            "benchmark exited with nonzero status"
                        );
                        summary.failed_runs += 1;
                    }

                    let record = result.into_record(self.profile);
                    let row = SweepRecord::from_run(
                        &plan.workload,
                        point,
                        run_index,
                        record,
                        &Local::now(),
                    );
                    sink.append(&row)?;

                    summary.rows_written += 1;
                    summary.total_errors = summary.total_errors.saturating_add(row.errors);

                    let line = format_progress_line(&row);
                    debug!("{}", line);
                    if self.show_progress {
                        pb.suspend(|| println!("{}", line));
                    }
                    pb.inc(1);
                }
            }
        }

        pb.finish_and_clear();
        info!(
            rows = summary.rows_written,
            failed = summary.failed_runs,
            errors = summary.total_errors,
            "sweep complete"
        );
        Ok(summary)
    }

    fn reset_and_load(
        &self,
        reset: &ResetTarget,
        n_users: u32,
        fanout: u32,
    ) -> Result<(), SweepError> {
        let steps = [
            (ResetStep::Schema, reset.schema_command()),
            (ResetStep::Load, reset.load_command(n_users, fanout)),
        ];

        for (step, command) in steps {
            info!(fanout, command = %command, "{}", step);
            let output = self.runner.execute(&command)?;
            if output.exit_code != 0 {
                warn!(fanout, exit_code = output.exit_code, output = %output.output.trim_end(), "{} failed", step);
                return Err(SweepError::Precondition {
                    step,
                    fanout,
                    exit_code: output.exit_code,
                    command: command.display(),
                });
            }
            debug!(fanout, "{} complete", step);
        }

        info!(fanout, n_users, "data set ready");
        Ok(())
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkTarget;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use sweepbench_core::{CommandSpec, RunOutput};
    use sweepbench_report::{WorkloadColumns, read_records};

    const PGBENCH_OUTPUT: &str = "\
number of failed transactions: 0 (0.000%)
latency average = 4.823 ms
latency stddev = 1.204 ms
tps = 828.776215 (without initial connection time)
";

    /// Scripted runner: every command gets `output`; commands whose line
    /// contains a key of `exit_codes` get that exit code.
    struct Scripted {
        output: &'static str,
        exit_codes: BTreeMap<&'static str, i32>,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(output: &'static str) -> Self {
            Self {
                output,
                exit_codes: BTreeMap::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing(mut self, needle: &'static str, code: i32) -> Self {
            self.exit_codes.insert(needle, code);
            self
        }
    }

    impl ProcessRunner for Scripted {
        fn execute(&self, command: &CommandSpec) -> Result<RunOutput, RunnerError> {
            let line = command.display();
            self.calls.borrow_mut().push(line.clone());
            let exit_code = self
                .exit_codes
                .iter()
                .find(|(needle, _)| line.contains(*needle))
                .map_or(0, |(_, code)| *code);
            Ok(RunOutput {
                output: self.output.to_string(),
                exit_code,
            })
        }
    }

    fn config(plan: SweepPlan, with_reset: bool) -> SweepConfig {
        SweepConfig {
            bench: BenchTarget {
                executable: "pgbench".to_string(),
                database: "tinyinsta".to_string(),
                script: PathBuf::from(&plan.workload.sql_file),
                query_mode: "prepared".to_string(),
                n_users: plan.workload.n_users,
                duration_secs: plan.workload.duration_s,
                progress_secs: 5,
                extra_args: Vec::new(),
                env: BTreeMap::new(),
            },
            reset: with_reset.then(|| ResetTarget {
                psql: "psql".to_string(),
                database: "tinyinsta".to_string(),
                schema_script: PathBuf::from("schema.sql"),
                load_script: PathBuf::from("load.sql"),
                posts_per_user: 10,
                env: BTreeMap::new(),
            }),
            profile: ExtractionProfile::pgbench().unwrap(),
            sink: SinkTarget::Path(PathBuf::from("unused.csv")),
            plan,
        }
    }

    fn workload(sql: &str) -> WorkloadColumns {
        WorkloadColumns {
            sql_file: sql.to_string(),
            n_users: 8,
            duration_s: 1,
        }
    }

    #[test]
    fn test_rows_in_plan_order() {
        let plan = SweepPlan::clients(workload("timeline.sql"), vec![1, 2], 2).unwrap();
        let cfg = config(plan, false);
        let runner = Scripted::new(PGBENCH_OUTPUT);
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = SweepDriver::new(&runner, &cfg)
            .run(&cfg.plan, &mut sink)
            .unwrap();
        assert_eq!(summary.rows_written, 4);
        assert_eq!(summary.resets, 0);

        let rows = read_records(sink.into_inner().unwrap().as_slice()).unwrap();
        let coords: Vec<_> = rows.iter().map(|r| (r.clients, r.run_index)).collect();
        assert_eq!(coords, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
        assert_eq!(rows[0].tps, Some(828.776215));
        assert_eq!(rows[0].latency_std_ms, Some(1.204));
        assert_eq!(rows[0].fanout, None);
        assert!(runner.calls.borrow().iter().all(|c| c.starts_with("pgbench")));
    }

    #[test]
    fn test_reset_once_per_fanout() {
        let plan = SweepPlan::fanout(workload("load.sql"), vec![12, 20], vec![8], 2).unwrap();
        let cfg = config(plan, true);
        let runner = Scripted::new(PGBENCH_OUTPUT);
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = SweepDriver::new(&runner, &cfg)
            .run(&cfg.plan, &mut sink)
            .unwrap();
        assert_eq!(summary.resets, 2);
        assert_eq!(summary.rows_written, 4);

        let calls = runner.calls.borrow();
        let kinds: Vec<_> = calls
            .iter()
            .map(|c| c.split_whitespace().next().unwrap_or_default())
            .collect();
        assert_eq!(
            kinds,
            vec!["psql", "psql", "pgbench", "pgbench", "psql", "psql", "pgbench", "pgbench"]
        );
        assert!(calls[1].contains("follows_per_user=12"));
        assert!(calls[5].contains("follows_per_user=20"));
    }

    #[test]
    fn test_load_failure_aborts_before_rows() {
        let plan = SweepPlan::fanout(workload("load.sql"), vec![12, 30], vec![8], 1).unwrap();
        let cfg = config(plan, true);
        let runner = Scripted::new(PGBENCH_OUTPUT).failing("-v follows_per_user=30", 3);
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let err = SweepDriver::new(&runner, &cfg)
            .run(&cfg.plan, &mut sink)
            .unwrap_err();
        match err {
            SweepError::Precondition {
                step,
                fanout,
                exit_code,
                ..
            } => {
                assert_eq!(step, ResetStep::Load);
                assert_eq!(fanout, 30);
                assert_eq!(exit_code, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sink.rows(), 1);
    }

    #[test]
    fn test_schema_failure_aborts_before_load_and_bench() {
        let plan = SweepPlan::fanout(workload("load.sql"), vec![12, 30], vec![8], 1).unwrap();
        let cfg = config(plan, true);
        let runner = Scripted::new(PGBENCH_OUTPUT).failing("-f schema.sql", 1);
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let err = SweepDriver::new(&runner, &cfg)
            .run(&cfg.plan, &mut sink)
            .unwrap_err();
        assert!(matches!(
            err,
            SweepError::Precondition {
                step: ResetStep::Schema,
                fanout: 12,
                exit_code: 1,
                ..
            }
        ));
        assert_eq!(sink.rows(), 0);

        let calls = runner.calls.borrow();
        assert_eq!(*calls, vec!["psql tinyinsta -f schema.sql".to_string()]);
        assert!(!calls.iter().any(|c| c.starts_with("pgbench")));
    }

    #[test]
    fn test_nonzero_benchmark_exit_recorded() {
        let plan = SweepPlan::clients(workload("timeline.sql"), vec![1, 2], 1).unwrap();
        let cfg = config(plan, false);
        let runner = Scripted::new("connection refused\n").failing("-c 1 ", 2);
        let mut sink = CsvSink::new(Vec::new()).unwrap();

        let summary = SweepDriver::new(&runner, &cfg)
            .run(&cfg.plan, &mut sink)
            .unwrap();
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.failed_runs, 1);

        let rows = read_records(sink.into_inner().unwrap().as_slice()).unwrap();
        assert_eq!(rows[0].returncode, 2);
        assert_eq!(rows[0].tps, None);
        assert_eq!(rows[1].returncode, 0);
    }

    #[test]
    fn test_error_display() {
        let err = SweepError::Precondition {
            step: ResetStep::Schema,
            fanout: 20,
            exit_code: 1,
            command: "psql tinyinsta -f schema.sql".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Schema reset for fanout=20 failed with exit status 1: psql tinyinsta -f schema.sql"
        );
    }
}
