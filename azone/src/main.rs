use clap::Parser;
use std::path::PathBuf;

use azone_core::{AzoneError, AzoneResult};

mod commands;

#[derive(Parser)]
#[command(name = "azone")]
#[command(about = "Availability zone and subnet management", long_about = None)]
struct Cli {
    /// Data directory holding zone state (overrides configuration)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not inspect host interfaces or ping gateways
    #[arg(long, global = true)]
    no_host_probe: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Availability zone operations
    Zones {
        #[command(subcommand)]
        command: ZoneCommands,
    },
    /// Resolve the subnet used by a bridge
    Subnet {
        /// Bridge device name
        #[arg(long)]
        bridge: String,

        /// Directory for bridge subnet records [default: <data-dir>/network]
        #[arg(long)]
        network_dir: Option<PathBuf>,
    },
}

#[derive(clap::Subcommand)]
enum ZoneCommands {
    /// List all zones
    List {
        /// Sort by name or subnet instead of configured order
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
    },
    /// Show one zone in detail
    Show { name: String },
    /// Mark a zone available or unavailable
    SetAvailable {
        name: String,
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        available: bool,
    },
    /// Pick the next zone round-robin
    Auto,
    /// Print the default zone
    Default,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum SortKey {
    Name,
    Subnet,
}

fn init_logging() -> AzoneResult<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "azone=info"
            .parse()
            .map_err(|e| AzoneError::Configuration {
                message: format!("Invalid log directive: {}", e),
            })?,
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> AzoneResult<()> {
    init_logging()?;

    let cli = Cli::parse();
    commands::run(cli)
}
