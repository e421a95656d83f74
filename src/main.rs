use anyhow::Result;
use clap::Parser;
use mssqlpilot::cli::commands::{Cli, Commands};
use mssqlpilot::cli::handlers::{handle_config_command, handle_discover_command, handle_generate_command};
use mssqlpilot::cli::utils::{init_logging, print_info};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Execute command
    match cli.command {
        Commands::Generate(args) => handle_generate_command(args).await,

        Commands::Discover { settings, json } => handle_discover_command(settings, json, cli.verbose).await,

        Commands::Config { settings } => handle_config_command(settings),

        Commands::Info => {
            print_info();
            Ok(())
        }
    }
}
