//! Blocking execution of external tools with captured output.
//!
//! There is no timeout: a hung `sc`, `net` or wrapper invocation hangs the
//! whole run. That is acceptable for an operator-driven tool and mirrors how
//! the OS tools behave when run by hand.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of running one external command. Never an `Err`: spawn failures
/// are folded into an unsuccessful outcome carrying the OS error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    /// Rendered command line, for logs and reports.
    pub command: String,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if the process ran and reported one.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn from_output(command: String, output: Output) -> Self {
        Self {
            command,
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    pub fn spawn_failed(command: String, err: &std::io::Error) -> Self {
        Self {
            command,
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: format!("Failed to launch: {}", err),
        }
    }

    /// Best single-line explanation of what happened.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated without an exit status".to_string(),
        }
    }

    /// Echo the tool's own output into the operator log.
    pub fn log_output(&self) {
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            info!(command = %self.command, "{}", stdout);
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            warn!(command = %self.command, "{}", stderr);
        }
    }
}

/// Runs external programs. Faked in tests.
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> CommandOutcome;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &Path, args: &[OsString]) -> CommandOutcome {
        (**self).run(program, args)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> CommandOutcome {
        let command = render_command(program, args);
        debug!(command = %command, "Executing subprocess");

        let start = Instant::now();
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match output {
            Ok(output) => {
                let outcome = CommandOutcome::from_output(command, output);
                debug!(
                    success = outcome.success,
                    exit_code = ?outcome.exit_code,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Subprocess completed"
                );
                outcome
            }
            Err(err) => {
                warn!(command = %command, error = %err, "Failed to spawn subprocess");
                CommandOutcome::spawn_failed(command, &err)
            }
        }
    }
}

/// Render a command line for display; arguments with spaces are quoted.
pub fn render_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| {
            let part = part.to_string_lossy();
            if part.contains(char::is_whitespace) {
                format!("\"{}\"", part)
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
