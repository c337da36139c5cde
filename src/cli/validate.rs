//! `unipak validate`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliContext;

#[derive(Args)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// The catalog was already loaded and validated on the way in, so
    /// reaching this point means it passed; report what it contains.
    pub async fn execute(self, ctx: CliContext) -> Result<()> {
        let catalog = &ctx.catalog;
        println!("catalog directory: {}", ctx.config_dir.display());
        println!(
            "{} sources, {} packages, {} custom, {} github",
            catalog.sources.len(),
            catalog.packages.len(),
            catalog.custom_packages.len(),
            catalog.github_release_packages.len()
        );
        println!("{}", "catalog valid".green());
        Ok(())
    }
}
