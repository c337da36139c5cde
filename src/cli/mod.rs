//! Command-line interface.
//!
//! Each subcommand lives in its own module with its own argument struct
//! and execution logic. The top-level [`Cli`] parses global flags,
//! initializes logging, loads the catalog, and delegates.
//!
//! Global flags:
//! - `--verbose` forces debug-level logging for unipak's own modules
//! - `--config` points at any file inside an alternate catalog directory
//!   (all `*.yaml` files in that directory are merged)

mod install;
mod list;
mod remove;
mod search;
mod update;
mod validate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::catalog::{Catalog, loader};

/// Top-level CLI for unipak.
#[derive(Parser)]
#[command(
    name = "unipak",
    about = "Catalog-driven package operation orchestrator",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show detailed steps and the commands being run.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to any file inside the catalog directory
    /// (default directory: ~/.config/unipak).
    #[arg(short, long, global = true, env = "UNIPAK_CONFIG")]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package and everything it depends on.
    Install(install::InstallArgs),
    /// Update one package, or every tracked package with no argument.
    Update(update::UpdateArgs),
    /// Remove a package.
    Remove(remove::RemoveArgs),
    /// List tracked packages with their installed versions.
    List(list::ListArgs),
    /// Search the configured sources.
    Search(search::SearchArgs),
    /// Load and validate the catalog, reporting what it contains.
    Validate(validate::ValidateArgs),
}

/// Everything a command needs beyond its own arguments.
pub struct CliContext {
    pub catalog: Catalog,
    pub config_dir: PathBuf,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose);
        let config_dir = loader::config_dir(self.config.as_deref());
        let catalog = loader::load_dir(&config_dir)?;
        let ctx = CliContext { catalog, config_dir };
        match self.command {
            Commands::Install(args) => args.execute(ctx).await,
            Commands::Update(args) => args.execute(ctx).await,
            Commands::Remove(args) => args.execute(ctx).await,
            Commands::List(args) => args.execute(ctx).await,
            Commands::Search(args) => args.execute(ctx).await,
            Commands::Validate(args) => args.execute(ctx).await,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("unipak=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // try_init so tests invoking the CLI twice don't panic.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
