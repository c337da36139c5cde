//! unipak CLI entry point.

use clap::Parser;
use colored::Colorize;
use unipak::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.execute().await {
        eprintln!("{} {err:#}", "error:".red());
        std::process::exit(1);
    }
}
