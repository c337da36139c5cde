//! `unipak list`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliContext;
use crate::engine::Engine;
use crate::state::StateStore;
use crate::version;

#[derive(Args)]
pub struct ListArgs {
    /// Also verify recorded file checksums and flag modified installs.
    #[arg(long)]
    verify: bool,
}

impl ListArgs {
    pub async fn execute(self, ctx: CliContext) -> Result<()> {
        let state = StateStore::open(&ctx.config_dir)?;
        let engine = Engine::new(ctx.catalog);

        for (group, names) in engine.tracked() {
            println!("[{group}]");
            for name in &names {
                let key = engine.key_for(name)?;
                let installed = engine.installed_version(&key).await;
                let shown = if installed.is_empty() {
                    "not installed".bright_black().to_string()
                } else {
                    version::normalize(&installed)
                };

                let mut marker = String::new();
                if self.verify
                    && let Some(record) = state.get(name)
                    && !record.file_checksums.is_empty()
                    && !state.verify_checksums(name)?
                {
                    marker = format!(" {}", "(files modified)".red());
                }
                println!("  {name} ({shown}){marker}");
            }
            println!();
        }
        Ok(())
    }
}
