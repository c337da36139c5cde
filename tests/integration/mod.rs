//! Integration test suite.
//!
//! Exercises the engine end-to-end over real shell commands and the CLI
//! binary itself. Everything here runs unprivileged; no script sets
//! `require_root`.

mod cli_smoke;
mod engine_end_to_end;
