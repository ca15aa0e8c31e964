//! CLI argument definitions for sharebridge.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Version string with build metadata for `--version`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("SHAREBRIDGE_GIT_COMMIT"),
    ", built ",
    env!("SHAREBRIDGE_BUILD_TIMESTAMP"),
    ")"
);

/// sharebridge - Keep a third-party share widget in sync with host state.
///
/// Resolves the widget script address and replays bridge operations against
/// an in-memory page.
#[derive(Parser, Debug)]
#[command(name = "sharebridge")]
#[command(author, version, long_version = LONG_VERSION, about = "Bridge host share state to an external share widget", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Options file to read instead of ~/.config/sharebridge/config.kdl.
    /// Can also be set via SHAREBRIDGE_CONFIG environment variable.
    #[arg(short = 'c', long = "config", global = true, env = "SHAREBRIDGE_CONFIG")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the widget script address
    ScriptUrl {
        /// Script environment (production, dev, test, local, unittest)
        #[arg(short, long)]
        environment: Option<String>,

        /// Site profile id appended as #pubid=<id>
        #[arg(short, long)]
        profile_id: Option<String>,
    },

    /// Options file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Replay bridge operations against an in-memory page
    ///
    /// The page fixture is a JSON object with optional `addthis_config`,
    /// `addthis_share`, `scripts` and `widget` keys. Operations are a JSON
    /// array of objects tagged by `op`.
    Simulate {
        /// Page fixture (JSON)
        #[arg(long)]
        page: PathBuf,

        /// Operations to apply after bootstrap (JSON array)
        #[arg(long)]
        ops: Option<PathBuf>,

        /// Virtual time to let pending refreshes settle, in milliseconds
        #[arg(long, default_value_t = 2000)]
        settle_ms: u64,

        /// Script environment override
        #[arg(short, long)]
        environment: Option<String>,

        /// Profile id override
        #[arg(short, long)]
        profile_id: Option<String>,

        /// Do not inject the script during bootstrap
        #[arg(long)]
        no_auto_add: bool,
    },
}

/// Options file subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved options and where each value came from
    Show {
        /// Script environment override
        #[arg(short, long)]
        environment: Option<String>,

        /// Profile id override
        #[arg(short, long)]
        profile_id: Option<String>,
    },

    /// Write a config file with the default options
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the path of the options file
    Path,
}
