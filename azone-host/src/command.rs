//! Command execution interface
//!
//! The host probes only ever run short, non-interactive commands and read
//! their output, so the interface is a single blocking call. Tests substitute
//! a runner that returns canned output.

use azone_core::{AzoneError, AzoneResult};
use std::process::Command;
use std::time::Instant;
use tracing::debug;

/// Output from command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status code, -1 when killed by a signal
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion. Only a failure to start the
    /// process is an error; a non-zero exit is reported in the output.
    fn run(&self, program: &str, args: &[&str]) -> AzoneResult<CommandOutput>;
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> AzoneResult<CommandOutput> {
        let started = Instant::now();
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| AzoneError::HostCommand {
                command: command_line(program, args),
                details: format!("failed to start: {}", e),
            })?;

        debug!(
            "Ran '{}' in {:?} (status {:?})",
            command_line(program, args),
            started.elapsed(),
            output.status.code()
        );

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

pub(crate) fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
