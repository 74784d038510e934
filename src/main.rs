use anyhow::Result;
use baht_rates::cli::setup::setup;
use baht_rates::core::log::init_logging;
use clap::{CommandFactory, Parser, Subcommand};

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

impl From<Commands> for baht_rates::AppCommand {
    fn from(cmd: Commands) -> baht_rates::AppCommand {
        match cmd {
            Commands::Rates { refresh, json } => baht_rates::AppCommand::Rates { refresh, json },
            Commands::Convert {
                amount,
                from,
                to,
                json,
            } => baht_rates::AppCommand::Convert {
                amount,
                from,
                to,
                json,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current exchange rates
    Rates {
        /// Discard cached rates and fetch again
        #[arg(long)]
        refresh: bool,
        /// Print the rates payload as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert an amount between two currencies (THB is always available)
    Convert {
        amount: f64,
        from: String,
        to: String,
        /// Print the conversion as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => baht_rates::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
