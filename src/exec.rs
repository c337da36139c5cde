//! Captured shell execution for version queries and hooks.
//!
//! Unlike the [`crate::runner`] path, which is for mutating operations and
//! may prompt for credentials, these helpers always capture output and
//! never block on a terminal: scripts that need root are wrapped with
//! `sudo -n`, so an absent grant fails fast instead of hanging a
//! concurrent status query on a hidden prompt.

use tokio::process::Command;
use tracing::debug;

use crate::catalog::ScriptSpec;
use crate::runner::{elevated_command, is_effective_root};

/// Captured result of one shell invocation.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout with surrounding whitespace removed, the shape version
    /// queries are expected to produce.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Run a script through `bash -ceu`, capturing stdout and stderr.
///
/// Spawn failures are folded into the result as a non-zero exit rather
/// than an error: callers uniformly branch on [`ShellOutput::success`].
pub async fn run_shell(script: &ScriptSpec) -> ShellOutput {
    let mut command = script.command.clone();
    if script.require_root && !is_effective_root() {
        command = elevated_command(&command);
    }
    debug!("shell: {command}");
    match Command::new("bash").args(["-ceu", &command]).output().await {
        Ok(output) => ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code().unwrap_or(1),
        },
        Err(err) => ShellOutput { stdout: String::new(), stderr: err.to_string(), code: 1 },
    }
}
