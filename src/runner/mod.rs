//! Privileged command execution.
//!
//! [`CommandRunner`] is the seam between the engine and the operating
//! system: every mutating package command goes through it. The production
//! implementation, [`SudoRunner`], executes scripts through `bash -ceu`,
//! obtains a sudo credential grant interactively on first need, caches it
//! for the life of the runner, and keeps it fresh with a background
//! `sudo -n -v` task so long-running batches never re-prompt.
//!
//! All shell quoting lives in this module. Scripts wrapped for elevation
//! are single-quoted with embedded quotes escaped, so variable expansion
//! happens exactly once, inside the elevated shell, never prematurely in
//! the outer one.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::catalog::ScriptSpec;
use crate::core::{Result, UnipakError};

/// How often the cached sudo grant is silently revalidated.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// True when the process already runs with effective root privileges.
pub fn is_effective_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

/// Escape a script for inclusion inside single quotes.
///
/// Each `'` becomes `'"'"'`: close the quote, emit a double-quoted quote,
/// reopen. The classic dance, but doing it in exactly one place keeps the
/// caller-side substitution and the elevation wrapper from interacting.
pub fn quote_single(script: &str) -> String {
    script.replace('\'', "'\"'\"'")
}

/// Render a string as a single-quoted shell literal.
pub fn shell_literal(value: &str) -> String {
    format!("'{}'", quote_single(value))
}

/// Wrap a script in a non-interactive elevated invocation.
pub fn elevated_command(script: &str) -> String {
    format!("sudo -n bash -ceu '{}'", quote_single(script))
}

/// Executes package commands, elevating privileges on demand.
///
/// Implementations must be safe to share across concurrent execution
/// units; the engine holds one runner per invocation.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `script` on behalf of package `name` at pipeline step `step`.
    async fn run(&self, name: &str, step: &str, script: &ScriptSpec) -> Result<()>;

    /// Stop any background work owned by the runner. Skipping this leaks
    /// the keep-alive task until process exit.
    async fn close(&self);
}

#[derive(Default)]
struct ElevationState {
    granted: bool,
    keepalive: Option<JoinHandle<()>>,
}

/// The production [`CommandRunner`] backed by `sudo`.
///
/// The elevation grant and keep-alive handle are owned by this instance;
/// there are no process-wide globals, so tests and embedders can construct
/// and drop runners freely.
pub struct SudoRunner {
    state: Mutex<ElevationState>,
}

impl SudoRunner {
    pub fn new() -> Self {
        Self { state: Mutex::new(ElevationState::default()) }
    }

    /// Obtain (or reuse) the sudo credential grant.
    ///
    /// The first call prompts interactively with inherited stdio; later
    /// calls return the cached grant. Returns false when sudo is missing
    /// or the user fails authentication.
    async fn ensure_elevated(&self) -> bool {
        if is_effective_root() {
            return true;
        }
        let mut state = self.state.lock().await;
        if state.granted {
            return true;
        }
        if which::which("sudo").is_err() {
            warn!("sudo not found on PATH, cannot elevate");
            return false;
        }
        let status = Command::new("sudo")
            .arg("-v")
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await;
        match status {
            Ok(exit) if exit.success() => {
                state.granted = true;
                state.keepalive = Some(spawn_keepalive());
                true
            }
            _ => false,
        }
    }
}

impl Default for SudoRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_keepalive() -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
        // The first tick fires immediately; the grant was just validated.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let refreshed = Command::new("sudo")
                .args(["-n", "-v"])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if let Err(err) = refreshed {
                debug!("sudo keep-alive failed: {err}");
            }
        }
    })
}

#[async_trait]
impl CommandRunner for SudoRunner {
    async fn run(&self, name: &str, step: &str, script: &ScriptSpec) -> Result<()> {
        let mut command = script.command.clone();
        if script.require_root && !is_effective_root() {
            if !self.ensure_elevated().await {
                return Err(UnipakError::PrivilegeDenied {
                    name: name.to_string(),
                    step: step.to_string(),
                });
            }
            command = elevated_command(&command);
        }

        debug!("{name} [{step}]: {command}");
        let output = Command::new("bash").args(["-ceu", &command]).output().await?;

        // Surface tool output the way the commands themselves would.
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.is_empty() {
            print!("{stdout}");
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            eprint!("{stderr}");
        }

        if output.status.success() {
            Ok(())
        } else {
            let code = output.status.code().unwrap_or(1);
            Err(UnipakError::command_failed(name, step, code, &stderr))
        }
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        if let Some(handle) = state.keepalive.take() {
            handle.abort();
        }
        state.granted = false;
    }
}
