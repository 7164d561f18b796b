//! contribd
//!
//! Deploys contribution files into an in-process component, watches them
//! and redeploys on change.

mod cli;
mod commands;
mod error;
mod logging;
mod runtime;

use clap::Parser;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Commands::Watch { files, config } => commands::run_watch(&files, config.as_deref()),
        Commands::CheckConfig { path } => commands::run_check_config(&path),
    }
}
