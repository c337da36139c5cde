//! `unipak remove <package>`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliContext;
use crate::engine::Engine;
use crate::runner::{CommandRunner, SudoRunner};
use crate::state::StateStore;

#[derive(Args)]
pub struct RemoveArgs {
    /// Package name from the catalog.
    name: String,
}

impl RemoveArgs {
    pub async fn execute(self, ctx: CliContext) -> Result<()> {
        let engine = Engine::new(ctx.catalog);
        let runner = SudoRunner::new();
        let result = engine.remove(&self.name, &runner).await;
        runner.close().await;
        result?;

        StateStore::open(&ctx.config_dir)?.forget(&self.name)?;
        println!("{}", format!("removed: {}", self.name).green());
        Ok(())
    }
}
