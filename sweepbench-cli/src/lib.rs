#![warn(missing_docs)]
//! SweepBench CLI Library
//!
//! This module provides the command-line driver for parameter sweeps over an
//! external load generator (pgbench). Use `sweepbench::run()` (or
//! `sweepbench_cli::run()`) in a main function.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     sweepbench_cli::run()
//! }
//! ```

mod config;
mod executor;
mod planner;
mod supervisor;

pub use config::*;
pub use executor::{
    ResetStep, SweepDriver, SweepError, SweepSummary, format_aggregate_human, format_plan,
    format_progress_line, format_summary,
};
pub use planner::{PlanGroup, SweepPlan};
pub use supervisor::SystemRunner;

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use sweepbench_core::{BenchTarget, ExtractionProfile, ResetTarget};
use sweepbench_report::{
    AxisKind, CsvSink, OutputFormat, WorkloadColumns, aggregate, default_sink_path,
    generate_csv_report, generate_json_report, read_records_from_path,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// SweepBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "sweepbench")]
#[command(author, version, about = "SweepBench - parameter sweeps for pgbench")]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: sweep.toml found by walking up from the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print warnings and the result path
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep client concurrency for one workload script
    Clients(ClientsArgs),
    /// Sweep fanout x clients, resetting and reloading the data set per fanout
    Fanout(FanoutArgs),
    /// Summarise a sweep file per axis value
    Aggregate {
        /// Sweep CSV file
        #[arg(name = "CSV")]
        csv: PathBuf,
        /// Axis to group by: clients or fanout
        #[arg(long, default_value = "clients")]
        by: AxisKind,
        /// Output format: human, json, csv
        #[arg(long, default_value = "human")]
        format: OutputFormat,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a default sweep.toml
    Init {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options shared by both sweeps
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Database name or connection string [default: sweep.toml, else tinyinsta]
    #[arg(long)]
    pub db: Option<String>,

    /// Duration of each run in seconds [default: sweep.toml, else 30]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub duration: Option<u32>,

    /// Progress report interval in seconds [default: sweep.toml, else 5]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub progress: Option<u32>,

    /// Repetitions per configuration point
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub runs: u32,

    /// Output CSV path (overwritten if it exists)
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Extra flags passed to the benchmark, e.g. --extra "-r -j 2"
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub extra: String,

    /// Print the planned commands without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments of the client sweep
#[derive(Args, Debug, Clone)]
pub struct ClientsArgs {
    /// Workload script
    #[arg(long, default_value = "timeline.sql")]
    pub sql: PathBuf,

    /// Number of users in the data set
    #[arg(long, default_value_t = 10_000)]
    pub n_users: u32,

    /// Comma-separated client counts
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [1, 2, 4, 8, 16, 32],
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub clients: Vec<u32>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub run: RunArgs,
}

/// Arguments of the fanout sweep
#[derive(Args, Debug, Clone)]
pub struct FanoutArgs {
    /// Workload script
    #[arg(long, default_value = "load.sql")]
    pub sql: PathBuf,

    /// Number of users in the data set
    #[arg(long, default_value_t = 8)]
    pub n_users: u32,

    /// Comma-separated client counts
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [8],
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub clients: Vec<u32>,

    /// Comma-separated fanout values (follows per user)
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [12, 20, 30, 40, 50, 60, 80, 100],
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub fanout: Vec<u32>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub run: RunArgs,
}

/// Run the SweepBench CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the SweepBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Clients(args) => {
            let file = load_file_config(cli.config.as_deref())?;
            let config = build_clients_config(args, &file)?;
            run_sweep(&config, args.run.dry_run, cli.quiet)
        }
        Commands::Fanout(args) => {
            let file = load_file_config(cli.config.as_deref())?;
            let config = build_fanout_config(args, &file)?;
            run_sweep(&config, args.run.dry_run, cli.quiet)
        }
        Commands::Aggregate {
            csv,
            by,
            format,
            output,
        } => aggregate_file(csv, *by, *format, output.as_deref()),
        Commands::Init { output } => init_config(output.as_deref()),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "sweepbench=debug"
    } else if quiet {
        "sweepbench=warn"
    } else {
        "sweepbench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded or under test
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_file_config(explicit: Option<&Path>) -> anyhow::Result<SweepFileConfig> {
    if let Some(path) = explicit {
        return SweepFileConfig::load(path);
    }
    match SweepFileConfig::discover()? {
        Some((path, config)) => {
            info!(path = %path.display(), "loaded configuration");
            Ok(config)
        }
        None => Ok(SweepFileConfig::default()),
    }
}

fn bench_target(sql: &Path, n_users: u32, run: &RunArgs, file: &SweepFileConfig) -> BenchTarget {
    BenchTarget {
        executable: file.bench.executable.clone(),
        database: run.db.clone().unwrap_or_else(|| file.target.database.clone()),
        script: sql.to_path_buf(),
        query_mode: file.bench.query_mode.clone(),
        n_users,
        duration_secs: run.duration.unwrap_or(file.bench.duration),
        progress_secs: run.progress.unwrap_or(file.bench.progress),
        extra_args: run.extra.split_whitespace().map(String::from).collect(),
        env: file.target.env.clone(),
    }
}

fn sink_target(run: &RunArgs, file: &SweepFileConfig, label: String) -> SinkTarget {
    match &run.csv {
        Some(path) => SinkTarget::Path(path.clone()),
        None => SinkTarget::Generated {
            directory: file.output.directory.clone(),
            label,
        },
    }
}

fn workload(bench: &BenchTarget) -> WorkloadColumns {
    WorkloadColumns {
        sql_file: bench.script.to_string_lossy().into_owned(),
        n_users: bench.n_users,
        duration_s: bench.duration_secs,
    }
}

fn profile(file: &SweepFileConfig) -> anyhow::Result<ExtractionProfile> {
    ExtractionProfile::with_overrides(&file.extract).context("Invalid [extract] pattern")
}

/// Layer CLI flags over `sweep.toml` for the client sweep
pub fn build_clients_config(
    args: &ClientsArgs,
    file: &SweepFileConfig,
) -> anyhow::Result<SweepConfig> {
    let bench = bench_target(&args.sql, args.n_users, &args.run, file);
    let plan = SweepPlan::clients(workload(&bench), args.clients.clone(), args.run.runs)?;
    let label = args
        .sql
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clients".to_string());

    Ok(SweepConfig {
        plan,
        reset: None,
        profile: profile(file)?,
        sink: sink_target(&args.run, file, label),
        bench,
    })
}

/// Layer CLI flags over `sweep.toml` for the fanout sweep
pub fn build_fanout_config(
    args: &FanoutArgs,
    file: &SweepFileConfig,
) -> anyhow::Result<SweepConfig> {
    let bench = bench_target(&args.sql, args.n_users, &args.run, file);
    let plan = SweepPlan::fanout(
        workload(&bench),
        args.fanout.clone(),
        args.clients.clone(),
        args.run.runs,
    )?;
    let reset = ResetTarget {
        psql: file.reset.psql.clone(),
        database: bench.database.clone(),
        schema_script: file.reset.schema_script.clone(),
        load_script: file.reset.load_script.clone(),
        posts_per_user: file.reset.posts_per_user,
        env: file.target.env.clone(),
    };

    Ok(SweepConfig {
        plan,
        reset: Some(reset),
        profile: profile(file)?,
        sink: sink_target(&args.run, file, "fanout".to_string()),
        bench,
    })
}

/// Open the sink file, returning the path actually used
pub fn open_sink(target: &SinkTarget) -> anyhow::Result<(PathBuf, CsvSink<File>)> {
    match target {
        SinkTarget::Path(path) => {
            let sink = CsvSink::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            Ok((path.clone(), sink))
        }
        SinkTarget::Generated { directory, label } => {
            let base = default_sink_path(directory, label, &Local::now());
            CsvSink::create_numbered(&base)
                .with_context(|| format!("Cannot create {}", base.display()))
        }
    }
}

fn run_sweep(config: &SweepConfig, dry_run: bool, quiet: bool) -> anyhow::Result<()> {
    if dry_run {
        print!("{}", format_plan(config));
        return Ok(());
    }

    let (path, mut sink) = open_sink(&config.sink)?;
    info!(path = %path.display(), "writing results");

    let runner = SystemRunner::new();
    let result = SweepDriver::new(&runner, config)
        .with_progress(!quiet)
        .run(&config.plan, &mut sink);

    match result {
        Ok(summary) => {
            if !quiet {
                println!("{}", format_summary(&summary));
            }
            println!("CSV saved to: {}", path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "Sweep aborted after {} rows; partial results in: {}",
                sink.rows(),
                path.display()
            );
            Err(e.into())
        }
    }
}

fn aggregate_file(
    csv: &Path,
    by: AxisKind,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let records = read_records_from_path(csv)
        .with_context(|| format!("Failed to read sweep file {}", csv.display()))?;
    let report = aggregate(&records, by);

    let rendered = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Csv => generate_csv_report(&report)?,
        OutputFormat::Human => format_aggregate_human(&report),
    };

    if let Some(path) = output {
        let mut file = File::create(path)
            .with_context(|| format!("Cannot create {}", path.display()))?;
        file.write_all(rendered.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", rendered);
    }
    Ok(())
}

fn init_config(output: Option<&Path>) -> anyhow::Result<()> {
    let content = SweepFileConfig::default_toml();
    match output {
        Some(path) => {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .with_context(|| format!("Refusing to overwrite {}", path.display()))?;
            file.write_all(content.as_bytes())?;
            println!("Configuration written to: {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
