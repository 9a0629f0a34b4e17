//! Command Construction
//!
//! Builds the exact command lines for the benchmark executable and the
//! schema reset / data load scripts.

use crate::ConfigPoint;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A fully resolved external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path
    pub program: String,
    /// Arguments in order
    pub args: Vec<String>,
    /// Extra environment variables (the parent environment is inherited)
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Replace the extra environment
    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env = env.clone();
        self
    }

    /// Command line as recorded in results: program and arguments joined by spaces
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Fixed parameters of every benchmark invocation in a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchTarget {
    /// Benchmark executable (`pgbench`)
    pub executable: String,
    /// Database name or connection string
    pub database: String,
    /// Workload script
    pub script: PathBuf,
    /// Query protocol (`simple`, `extended`, `prepared`)
    pub query_mode: String,
    /// User population passed as `-D n_users=`
    pub n_users: u32,
    /// Run duration in seconds
    pub duration_secs: u32,
    /// Progress report interval in seconds
    pub progress_secs: u32,
    /// Pass-through flags appended after the generated ones
    pub extra_args: Vec<String>,
    /// Extra environment for the benchmark process
    pub env: BTreeMap<String, String>,
}

impl BenchTarget {
    /// Command for one configuration point
    pub fn command_for(&self, point: &ConfigPoint) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.executable)
            .args(["-n", "-M"])
            .arg(&self.query_mode)
            .arg("-f")
            .arg(self.script.to_string_lossy())
            .arg("-c")
            .arg(point.clients.to_string())
            .arg("-T")
            .arg(self.duration_secs.to_string())
            .arg("-P")
            .arg(self.progress_secs.to_string())
            .arg("-d")
            .arg(&self.database)
            .arg("-D")
            .arg(format!("n_users={}", self.n_users));

        if let Some(fanout) = point.fanout {
            cmd = cmd.arg("-D").arg(format!("follows_per_user={}", fanout));
        }

        cmd.args(self.extra_args.iter().cloned()).envs(&self.env)
    }
}

/// Parameters of the destructive reset-and-reload step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTarget {
    /// SQL shell executable (`psql`)
    pub psql: String,
    /// Database name or connection string
    pub database: String,
    /// Script recreating the schema
    pub schema_script: PathBuf,
    /// Script loading the data set
    pub load_script: PathBuf,
    /// Posts generated per user by the load script
    pub posts_per_user: u32,
    /// Extra environment for the scripts
    pub env: BTreeMap<String, String>,
}

impl ResetTarget {
    /// Drop and recreate the schema
    pub fn schema_command(&self) -> CommandSpec {
        CommandSpec::new(&self.psql)
            .arg(&self.database)
            .arg("-f")
            .arg(self.schema_script.to_string_lossy())
            .envs(&self.env)
    }

    /// Load data sized for `n_users` and `fanout`
    pub fn load_command(&self, n_users: u32, fanout: u32) -> CommandSpec {
        CommandSpec::new(&self.psql)
            .arg(&self.database)
            .arg("-v")
            .arg(format!("n_users={}", n_users))
            .arg("-v")
            .arg(format!("follows_per_user={}", fanout))
            .arg("-v")
            .arg(format!("posts_per_user={}", self.posts_per_user))
            .arg("-f")
            .arg(self.load_script.to_string_lossy())
            .envs(&self.env)
    }
}
