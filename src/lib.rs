//! unipak - catalog-driven package operation orchestrator.
//!
//! unipak installs, updates, and removes software described by a YAML
//! catalog spanning three backend kinds: OS package managers driven by
//! shell command templates, custom per-package scripts, and GitHub
//! release binaries. Given a package name it computes a dependency-safe
//! execution order, runs independent work concurrently, elevates
//! privileges only when a command asks for it (and prompts at most once
//! per process), and reports per-package results without serializing
//! unrelated work.
//!
//! # Architecture
//!
//! Leaves first:
//! - [`version`] - version string normalization and ordinal comparison
//! - [`pattern`] - glob matching over release asset names
//! - [`resolver`] - dependency graph, cycle detection, deterministic
//!   topological ordering
//! - [`runner`] - privileged command execution with sudo credential
//!   caching and keep-alive
//! - [`github`] - GitHub releases API client and asset downloads
//! - [`engine`] - the orchestrator tying catalog, resolver, runner, and
//!   fetcher together
//!
//! Supporting modules: [`catalog`] (data model and loader), [`core`]
//! (error types), [`exec`] (captured shell execution), [`state`]
//! (optional install-state records), [`ui`] (console reporter), and
//! [`cli`] (the binary surface).
//!
//! # Catalog format
//!
//! ```yaml
//! sources:
//!   - name: apt
//!     install:
//!       command: apt-get install -y {package_list}
//!       require_root: true
//!     update:
//!       command: apt-get upgrade -y {package_list}
//!       require_root: true
//!     pre_update:
//!       command: apt-get update
//!       require_root: true
//!     get_installed_version: "dpkg-query -W -f='${Version}' {package} 2>/dev/null || true"
//!
//! packages:
//!   - name: git
//!     source: apt
//!
//! custom_packages:
//!   - name: rustup
//!     get_installed_version: "rustup --version 2>/dev/null | head -n1 | cut -d' ' -f2"
//!     install: "curl -sSf https://sh.rustup.rs | sh -s -- -y"
//!
//! github_release_packages:
//!   - name: lazygit
//!     repo: jesseduffield/lazygit
//!     asset_pattern: "*Linux_x86_64.tar.gz"
//!     get_installed_version: "lazygit --version 2>/dev/null | grep -o 'version=[^,]*' | cut -d= -f2"
//!     post_install:
//!       command: tar -C /usr/local/bin -xzf "$asset_path" lazygit
//!       require_root: true
//! ```

pub mod catalog;
pub mod cli;
pub mod core;
pub mod engine;
pub mod exec;
pub mod github;
pub mod pattern;
pub mod resolver;
pub mod runner;
pub mod state;
pub mod ui;
pub mod version;
