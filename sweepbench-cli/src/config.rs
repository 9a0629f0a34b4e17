//! Configuration loading from sweep.toml
//!
//! Defaults for the target database, the benchmark executable, the reset
//! scripts and the extraction patterns live in a `sweep.toml` file. It is
//! discovered by walking up from the current directory unless `--config`
//! names one explicitly. CLI flags override file values.

use crate::planner::SweepPlan;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use sweepbench_core::{BenchTarget, ExtractOverrides, ExtractionProfile, ResetTarget};

/// File name looked up during discovery
pub const CONFIG_FILE_NAME: &str = "sweep.toml";

/// Contents of `sweep.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SweepFileConfig {
    /// Database and environment shared by every external command
    #[serde(default)]
    pub target: TargetConfig,
    /// Benchmark executable settings
    #[serde(default)]
    pub bench: BenchConfig,
    /// Reset and load scripts used by the fanout sweep
    #[serde(default)]
    pub reset: ResetConfig,
    /// Extraction pattern overrides
    #[serde(default)]
    pub extract: ExtractOverrides,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Target database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database name or connection string
    #[serde(default = "default_database")]
    pub database: String,
    /// Environment variables applied to every external command
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            env: BTreeMap::new(),
        }
    }
}

fn default_database() -> String {
    "tinyinsta".to_string()
}

/// Benchmark executable settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Benchmark executable
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Query protocol: "simple", "extended" or "prepared"
    #[serde(default = "default_query_mode")]
    pub query_mode: String,
    /// Progress report interval in seconds
    #[serde(default = "default_progress")]
    pub progress: u32,
    /// Run duration in seconds
    #[serde(default = "default_duration")]
    pub duration: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            query_mode: default_query_mode(),
            progress: default_progress(),
            duration: default_duration(),
        }
    }
}

fn default_executable() -> String {
    "pgbench".to_string()
}
fn default_query_mode() -> String {
    "prepared".to_string()
}
fn default_progress() -> u32 {
    5
}
fn default_duration() -> u32 {
    30
}

/// Reset and load scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    /// SQL shell executable
    #[serde(default = "default_psql")]
    pub psql: String,
    /// Script dropping and recreating the schema
    #[serde(default = "default_schema_script")]
    pub schema_script: PathBuf,
    /// Script generating the data set
    #[serde(default = "default_load_script")]
    pub load_script: PathBuf,
    /// Posts generated per user
    #[serde(default = "default_posts_per_user")]
    pub posts_per_user: u32,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            psql: default_psql(),
            schema_script: default_schema_script(),
            load_script: default_load_script(),
            posts_per_user: default_posts_per_user(),
        }
    }
}

fn default_psql() -> String {
    "psql".to_string()
}
fn default_schema_script() -> PathBuf {
    PathBuf::from("schema.sql")
}
fn default_load_script() -> PathBuf {
    PathBuf::from("load.sql")
}
fn default_posts_per_user() -> u32 {
    10
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for generated result files
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl SweepFileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("Invalid {}", path.display()))?;
        Ok(config)
    }

    /// Walk up from `start` looking for `sweep.toml`
    pub fn discover_from(start: &Path) -> anyhow::Result<Option<(PathBuf, Self)>> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                let config = Self::load(&config_path)?;
                return Ok(Some((config_path, config)));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Walk up from the current directory looking for `sweep.toml`
    pub fn discover() -> anyhow::Result<Option<(PathBuf, Self)>> {
        let cwd = std::env::current_dir().context("Cannot determine current directory")?;
        Self::discover_from(&cwd)
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# SweepBench Configuration

[target]
# Database name or connection string passed to pgbench -d and psql
database = "tinyinsta"

# Environment variables for every external command (uncomment to enable)
# [target.env]
# PGHOST = "localhost"
# PGUSER = "postgres"

[bench]
# Benchmark executable
executable = "pgbench"
# Query protocol: simple, extended or prepared
query_mode = "prepared"
# Progress report interval in seconds
progress = 5
# Run duration in seconds
duration = 30

[reset]
# SQL shell used by the fanout sweep to reset and reload the data set
psql = "psql"
schema_script = "schema.sql"
load_script = "load.sql"
posts_per_user = 10

[extract]
# Override extraction patterns; the last capture group is the value
# throughput = 'tps\s*=\s*([0-9]+(?:\.[0-9]+)?)'
# latency_mean = 'latency average\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*ms'
# latency_stddev = 'latency stddev\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*ms'
# errors = '(?i)\b(errors|serialization failures|deadlocks)\b.*?:\s*([0-9]+)'

[output]
# Directory for results_<label>_<timestamp>.csv when --csv is not given
directory = "."
"#
        .to_string()
    }
}

/// Where sweep rows go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Explicit path, truncated if present
    Path(PathBuf),
    /// Generated name under `directory`, never overwriting
    Generated {
        /// Output directory
        directory: PathBuf,
        /// Label embedded in the file name
        label: String,
    },
}

/// Fully resolved settings for one sweep invocation
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Points and repetitions to run
    pub plan: SweepPlan,
    /// Benchmark invocation parameters
    pub bench: BenchTarget,
    /// Reset/load step, run once per fanout value when present
    pub reset: Option<ResetTarget>,
    /// Rules applied to every run's output
    pub profile: ExtractionProfile,
    /// Result file location
    pub sink: SinkTarget,
}
