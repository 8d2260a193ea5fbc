//! Subprocess execution for the wrapped VPN clients
//!
//! The VPN clients are closed-source binaries, so every connect and
//! disconnect is a blocking `Command::output()` call. A client that runs and
//! exits non-zero is not an error here: the exit status and captured output
//! come back as a [`ProcessResult`] for the caller to inspect.

use std::io;
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Empty command")]
    EmptyCommand,
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },
}

/// Outcome of a finished subprocess
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub program: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    /// Exit code, `None` when the process was killed by a signal
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `argv[0]` with the remaining elements as arguments and wait for it
///
/// Arguments are never logged since they may carry credentials.
pub fn run_command<S: AsRef<str>>(argv: &[S]) -> Result<ProcessResult, ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
    let program = program.as_ref();

    debug!("Running {} with {} argument(s)", program, args.len());
    let output = Command::new(program)
        .args(args.iter().map(AsRef::as_ref))
        .output()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;
    debug!("{} exited with {}", program, output.status);

    Ok(ProcessResult {
        program: program.to_string(),
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Split a configured shell command line into argv on whitespace
///
/// No quoting rules apply: `launchctl load /path/a.plist` becomes three
/// arguments.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
