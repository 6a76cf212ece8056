use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use mmdash::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for mmdash::AppCommand {
    fn from(cmd: Commands) -> mmdash::AppCommand {
        match cmd {
            Commands::Update => mmdash::AppCommand::Update,
            Commands::Show => mmdash::AppCommand::Show,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch market data and refresh the dashboard files
    Update,
    /// Display the latest market snapshot
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => mmdash::cli::setup::setup(),
        Some(cmd) => mmdash::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
