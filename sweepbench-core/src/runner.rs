//! Process Runner
//!
//! Narrow capability for executing an external command synchronously.
//! The sweep driver only talks to this trait, so tests can substitute a
//! scripted runner for the real benchmark binary.

use crate::{CommandSpec, RunResult};
use thiserror::Error;

/// Errors that prevent a command from producing any result at all.
///
/// A nonzero exit status is not an error; it is reported in [`RunOutput`].
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to collect output of {program}: {source}")]
    Output {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// stdout and stderr merged into one stream
    pub output: String,
    /// Exit status (0 = success, negative = terminated by signal)
    pub exit_code: i32,
}

/// Executes one command to completion
pub trait ProcessRunner {
    /// Run `command`, block until it exits and return its merged output.
    fn execute(&self, command: &CommandSpec) -> Result<RunOutput, RunnerError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn execute(&self, command: &CommandSpec) -> Result<RunOutput, RunnerError> {
        (**self).execute(command)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for Box<R> {
    fn execute(&self, command: &CommandSpec) -> Result<RunOutput, RunnerError> {
        (**self).execute(command)
    }
}

/// Run `command` and attach its command line to the result.
pub fn invoke<R: ProcessRunner + ?Sized>(
    runner: &R,
    command: &CommandSpec,
) -> Result<RunResult, RunnerError> {
    let RunOutput { output, exit_code } = runner.execute(command)?;
    Ok(RunResult {
        output,
        exit_code,
        command: command.display(),
    })
}
