//! `unipak install <package>`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliContext;
use crate::engine::Engine;
use crate::runner::{CommandRunner, SudoRunner};
use crate::state::StateStore;
use crate::version;

#[derive(Args)]
pub struct InstallArgs {
    /// Package name from the catalog.
    name: String,

    /// Print the resolved plan and exit without installing anything.
    #[arg(long)]
    plan: bool,
}

impl InstallArgs {
    pub async fn execute(self, ctx: CliContext) -> Result<()> {
        let engine = Engine::new(ctx.catalog);
        let keys = engine.resolve_keys(&self.name)?;

        // Show the plan with status-only queries; nothing here may have
        // side effects, so availability uses the dry-run variant.
        for key in &keys {
            let installed = engine.installed_version(key).await;
            if !installed.is_empty() {
                println!(
                    "{}",
                    format!(
                        "skip (already installed): {key} {}",
                        version::normalize(&installed)
                    )
                    .bright_black()
                );
                continue;
            }
            let available = engine.available_version_dry_run(key).await;
            if available.is_empty() {
                println!("install: {key}");
            } else {
                println!("install: {key} -> {}", version::normalize(&available));
            }
        }
        if self.plan {
            return Ok(());
        }

        let runner = SudoRunner::new();
        let result = engine.install(&self.name, &runner).await;
        runner.close().await;
        result?;

        // Remember what landed so later runs can verify it.
        let key = engine.key_for(&self.name)?;
        let installed = engine.installed_version(&key).await;
        if !installed.is_empty() {
            StateStore::open(&ctx.config_dir)?.record(&self.name, &installed)?;
        }
        println!("{}", format!("installed: {}", self.name).green());
        Ok(())
    }
}
