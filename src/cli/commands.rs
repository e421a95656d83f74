use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mssqlpilot",
    about = "Discover SQL Server instances and configure Splunk error-log monitoring",
    version,
    author
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for logs
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover instances and write inputs.conf / props.conf for the forwarder
    Generate(GenerateArgs),

    /// Discover instances and their log paths without writing anything
    Discover {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Print a JSON report instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Display the effective configuration
    Config {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Show information about MSSQLPilot
    Info,
}

/// Settings shared by every command that talks to SQL Server hosts
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// YAML configuration file
    #[arg(short, long, env = "MSSQLPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Splunk app directory (files go to its `local` subdirectory)
    #[arg(long)]
    pub app_dir: Option<PathBuf>,

    /// Splunk index
    #[arg(long)]
    pub index: Option<String>,

    /// Sourcetype of the monitored logs
    #[arg(long)]
    pub sourcetype: Option<String>,

    /// Host to scan; repeat for several hosts (default: this machine)
    #[arg(long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Timeout in seconds for each external command
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Forwarder service to restart after writing
    #[arg(long)]
    pub service_name: Option<String>,

    /// Do not restart the forwarder service
    #[arg(long)]
    pub no_restart: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
