//! `unipak search <query>`

use anyhow::Result;
use clap::Args;
use tracing::debug;

use super::CliContext;
use crate::catalog::ScriptSpec;
use crate::exec;

#[derive(Args)]
pub struct SearchArgs {
    /// Search term passed to each source's search command.
    query: String,
}

impl SearchArgs {
    pub async fn execute(self, ctx: CliContext) -> Result<()> {
        for source in &ctx.catalog.sources {
            if source.search.is_empty() {
                continue;
            }
            let command = source.search.command.replace("{query}", &self.query);
            debug!("{} [search]: {command}", source.name);
            let output =
                exec::run_shell(&ScriptSpec::new(command, source.search.require_root)).await;
            if !output.stdout.is_empty() {
                print!("{}", output.stdout);
            }
            if !output.stderr.is_empty() {
                eprint!("{}", output.stderr);
            }
        }
        Ok(())
    }
}
