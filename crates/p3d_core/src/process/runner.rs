//! External command runner with captured output and bounded retries.
//!
//! Every pipeline stage invokes its external tool through the
//! [`ProcessRunner`] trait so tests can substitute a mock. The real
//! [`SystemRunner`] retries transient spawn failures with exponential
//! backoff; a non-zero exit from the target program is never retried.
//! Each invocation writes an audit line (command, status, elapsed
//! seconds) through `tracing`, reaching both the rotating audit file
//! and stderr.

use std::cmp;
use std::io;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Captured result of a completed external command.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Errors from running an external command.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Empty argument vector.
    #[error("empty command line")]
    EmptyCommand,

    /// The command could not be spawned after all retry attempts.
    #[error("failed to spawn '{tool}' after {attempts} attempts: {source}")]
    Spawn {
        tool: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// The target program ran but exited with a non-zero code.
    #[error("'{tool}' exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        tool: String,
        exit_code: i32,
        stderr: String,
    },
}

/// Capability seam for running external commands.
pub trait ProcessRunner: Send + Sync {
    /// Run `argv` to completion with captured output.
    ///
    /// Returns `Err(ProcessError::NonZeroExit)` when the program exits
    /// non-zero, `Err(ProcessError::Spawn)` when it cannot be started.
    fn run(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput, ProcessError>;
}

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(4);
const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);

/// [`ProcessRunner`] backed by `std::process::Command`.
pub struct SystemRunner {
    max_attempts: u32,
    backoff_min: Duration,
    backoff_cap: Duration,
}

impl SystemRunner {
    /// Runner with the standard retry policy (3 attempts, 4s backoff
    /// doubling up to a 10s cap).
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_min: DEFAULT_BACKOFF_MIN,
            backoff_cap: DEFAULT_BACKOFF_CAP,
        }
    }

    /// Runner with a custom retry policy.
    pub fn with_retry_policy(max_attempts: u32, backoff_min: Duration, backoff_cap: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_min,
            backoff_cap,
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let doubled = self.backoff_min * 2u32.saturating_pow(attempt.saturating_sub(1));
        cmp::min(doubled, self.backoff_cap)
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput, ProcessError> {
        let tool = argv.first().ok_or(ProcessError::EmptyCommand)?;
        let command_line = argv.join(" ");

        tracing::info!(target: "audit", command = %command_line, "executing command");
        let started = Instant::now();

        let mut attempt = 0;
        let output = loop {
            attempt += 1;

            let mut cmd = Command::new(tool);
            cmd.args(&argv[1..]);
            if let Some(dir) = cwd {
                cmd.current_dir(dir);
            }

            match cmd.output() {
                Ok(output) => break output,
                Err(source) => {
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            target: "audit",
                            command = %command_line,
                            status = "spawn_failed",
                            elapsed_secs = started.elapsed().as_secs_f64(),
                            error = %source,
                        );
                        return Err(ProcessError::Spawn {
                            tool: tool.clone(),
                            attempts: attempt,
                            source,
                        });
                    }
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        "spawn of '{}' failed ({}), retrying in {:.1}s",
                        tool,
                        source,
                        delay.as_secs_f64()
                    );
                    thread::sleep(delay);
                }
            }
        };

        let elapsed_secs = started.elapsed().as_secs_f64();
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::error!(
                target: "audit",
                command = %command_line,
                status = "failed",
                exit_code,
                elapsed_secs,
            );
            return Err(ProcessError::NonZeroExit {
                tool: tool.clone(),
                exit_code,
                stderr,
            });
        }

        tracing::info!(
            target: "audit",
            command = %command_line,
            status = "ok",
            elapsed_secs,
        );

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}
