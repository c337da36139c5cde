//! Error types for unipak operations.
//!
//! The error system centers on [`UnipakError`], a strongly-typed enum covering
//! every failure class the engine can produce. Callers that need to branch on
//! a failure (the CLI, the reporter flow) match on variants; everything else
//! propagates with `?`.
//!
//! # Error classes
//!
//! - **Lookup**: [`UnipakError::PackageNotFound`], [`UnipakError::SourceNotFound`],
//!   [`UnipakError::AssetNotFound`]
//! - **Resolution**: [`UnipakError::DependencyCycle`]
//! - **Execution**: [`UnipakError::MissingScript`], [`UnipakError::CommandFailed`],
//!   [`UnipakError::PrivilegeDenied`]
//! - **Network**: [`UnipakError::Network`]
//!
//! Version-query failures are deliberately not represented here: the engine
//! swallows them into empty version strings so that one broken source cannot
//! block unrelated status reporting.

use thiserror::Error;

/// Convenience alias used throughout the engine modules.
pub type Result<T> = std::result::Result<T, UnipakError>;

/// All failure modes of catalog resolution and package operations.
#[derive(Error, Debug)]
pub enum UnipakError {
    /// The requested name does not exist in the catalog.
    #[error("unknown package: {name}")]
    PackageNotFound {
        /// Name as requested by the caller.
        name: String,
    },

    /// A package references a source that is not defined in the catalog.
    #[error("unknown source: {name}")]
    SourceNotFound {
        /// The dangling source name.
        name: String,
    },

    /// No release asset matched the configured glob pattern.
    #[error("no asset matching pattern {pattern:?} in release {release}")]
    AssetNotFound {
        /// The asset-name glob pattern that failed to match.
        pattern: String,
        /// Tag of the release that was searched.
        release: String,
    },

    /// The dependency graph contains a cycle, so no valid execution order
    /// exists.
    #[error("dependency cycle detected among: {members}")]
    DependencyCycle {
        /// Names that could not be ordered, joined for display.
        members: String,
    },

    /// The operation requires a script that is not configured.
    #[error("missing {step} script for package: {name}")]
    MissingScript {
        /// Package (or source) the operation addressed.
        name: String,
        /// Pipeline step that had no command, e.g. `install` or `post_install`.
        step: String,
    },

    /// A shell command exited non-zero.
    ///
    /// Carries the exit code and the first line of stderr so failures stay
    /// readable in per-package result lines.
    #[error("command failed for {name} [{step}]: {stderr} (exit {code})")]
    CommandFailed {
        /// Package (or source batch) the command ran for.
        name: String,
        /// Pipeline step, e.g. `install`, `update-group`, `post_install`.
        step: String,
        /// Process exit code.
        code: i32,
        /// First line of captured stderr, empty when the command was silent.
        stderr: String,
    },

    /// A GitHub API call or asset download failed.
    #[error("network error during {operation}: {detail}")]
    Network {
        /// What was being attempted, e.g. `fetch latest release`.
        operation: String,
        /// Underlying failure rendered for display.
        detail: String,
    },

    /// Privilege elevation was declined or could not be obtained.
    #[error("elevation not granted for {name} [{step}]")]
    PrivilegeDenied {
        /// Package the privileged command belonged to.
        name: String,
        /// Step that required elevation.
        step: String,
    },

    /// Filesystem errors from temp directories and downloads.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UnipakError {
    /// True for both lookup-style "not found" variants.
    ///
    /// Callers offering fuzzy behavior (e.g. the CLI suggesting `list`)
    /// treat unknown packages and unmatched assets the same way.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PackageNotFound { .. } | Self::AssetNotFound { .. })
    }

    /// Build a [`UnipakError::CommandFailed`] from raw process output,
    /// keeping only the first stderr line.
    pub fn command_failed(name: &str, step: &str, code: i32, stderr: &str) -> Self {
        let first_line = stderr.trim().lines().next().unwrap_or("").to_string();
        Self::CommandFailed {
            name: name.to_string(),
            step: step.to_string(),
            code,
            stderr: first_line,
        }
    }
}
