//! `unipak update [package]`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliContext;
use crate::engine::Engine;
use crate::runner::{CommandRunner, SudoRunner};
use crate::state::StateStore;
use crate::ui::ConsoleReporter;

#[derive(Args)]
pub struct UpdateArgs {
    /// Package to update; with no name, runs the interactive flow over
    /// every tracked package.
    name: Option<String>,
}

impl UpdateArgs {
    pub async fn execute(self, ctx: CliContext) -> Result<()> {
        let engine = Engine::new(ctx.catalog);
        let runner = SudoRunner::new();

        let result = match &self.name {
            Some(name) => match engine.update_one(name, &runner).await {
                Ok(message) => {
                    println!("{}", format!("{name}: {message}").green());
                    let key = engine.key_for(name)?;
                    let installed = engine.installed_version(&key).await;
                    if !installed.is_empty() {
                        StateStore::open(&ctx.config_dir)?.record(name, &installed)?;
                    }
                    Ok(())
                }
                Err(err) => Err(err.into()),
            },
            None => {
                let reporter = ConsoleReporter::new();
                engine.run_update_flow(&reporter, &runner).await.map_err(Into::into)
            }
        };

        runner.close().await;
        result
    }
}
