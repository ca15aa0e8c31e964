//! sharebridge CLI - Resolve widget script addresses and replay bridge operations.

use clap::Parser;
use sharebridge::cli::{Cli, Commands, ConfigCommands};
use sharebridge::commands::{self, CommandResult, SimulateArgs};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "SHAREBRIDGE_LOG";

fn main() {
    init_logging();

    let cli = Cli::parse();
    let human = cli.human_readable;

    if let Err(e) = run_command(cli.command, cli.config_path.as_deref(), human) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Log to stderr so stdout stays machine readable. Defaults to warnings only.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_command(
    command: Commands,
    config_path: Option<&Path>,
    human: bool,
) -> Result<(), sharebridge::Error> {
    match command {
        Commands::ScriptUrl {
            environment,
            profile_id,
        } => {
            let result =
                commands::script_url(config_path, environment.as_deref(), profile_id.as_deref())?;
            output(&result, human);
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show {
                environment,
                profile_id,
            } => {
                let result = commands::config_show(
                    config_path,
                    environment.as_deref(),
                    profile_id.as_deref(),
                )?;
                output(&result, human);
            }
            ConfigCommands::Init { force } => {
                let result = commands::config_init(config_path, force)?;
                output(&result, human);
            }
            ConfigCommands::Path => {
                let result = commands::config_path(config_path)?;
                output(&result, human);
            }
        },
        Commands::Simulate {
            page,
            ops,
            settle_ms,
            environment,
            profile_id,
            no_auto_add,
        } => {
            let args = SimulateArgs {
                page,
                ops,
                settle_ms,
                environment,
                profile_id,
                no_auto_add,
            };
            let result = commands::simulate(config_path, &args)?;
            output(&result, human);
        }
    }
    Ok(())
}

fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
