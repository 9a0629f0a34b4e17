//! Supervisor Process
//!
//! Runs external commands to completion with stdout and stderr attached to a
//! single pipe, so the captured text preserves the order the child wrote it.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use sweepbench_core::{CommandSpec, ProcessRunner, RunOutput, RunnerError};
use tracing::debug;

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// New runner
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn execute(&self, cmd: &CommandSpec) -> Result<RunOutput, RunnerError> {
        let spawn_error = |source| RunnerError::Spawn {
            program: cmd.program.clone(),
            source,
        };
        let output_error = |source| RunnerError::Output {
            program: cmd.program.clone(),
            source,
        };

        let (mut reader, writer) = std::io::pipe().map_err(spawn_error)?;
        let stderr_writer = writer.try_clone().map_err(spawn_error)?;

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .envs(&cmd.env)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer);

        let mut child = command.spawn().map_err(spawn_error)?;
        debug!(program = %cmd.program, pid = child.id(), "spawned");

        // The write ends held by `command` must be closed before reading,
        // otherwise the read never sees EOF.
        drop(command);

        let mut buf = Vec::new();
        let read = reader.read_to_end(&mut buf);
        let status = child.wait().map_err(output_error)?;
        read.map_err(output_error)?;

        Ok(RunOutput {
            output: String::from_utf8_lossy(&buf).into_owned(),
            exit_code: exit_code(status),
        })
    }
}

/// Exit code, or the negated signal number for a killed process
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
