//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// contribd - deploy contribution files and reload them when they change
#[derive(Parser, Debug)]
#[command(name = "contribd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Deploy contribution files and redeploy them on change
    ///
    /// Each file holds a `contribution` list (TOML, JSON or YAML). Press
    /// Enter to print the current state, Ctrl-D to stop.
    ///
    /// Examples:
    ///   contribd watch defaults.toml overrides.json
    ///   contribd watch --config runtime.toml settings/*.yaml
    Watch {
        /// Contribution files to deploy
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Runtime configuration file (defaults to
        /// <config dir>/contribd/runtime.toml when present)
        #[arg(short, long, env = "CONTRIBD_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Parse a runtime configuration file and print the effective values
    CheckConfig {
        /// Path to the configuration file
        path: PathBuf,
    },
}
