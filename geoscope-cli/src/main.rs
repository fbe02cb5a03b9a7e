//! GeoScope CLI - Command-line interface
//!
//! Drives the GeoScope session engine from the command line: probe
//! temporal imagery availability, fetch datasets, or run a scripted
//! headless session demo.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "geoscope", version, about = "Geospatial dashboard session engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe the newest available date for a temporal overlay
    Probe {
        /// Temporal layer: co2 or ozone
        #[arg(long, default_value = "co2")]
        layer: String,
    },
    /// Fetch a dataset (preset name or URL) and print a summary
    Fetch {
        /// Preset id (earthquakes, city-trees, satellite-anomalies) or a URL
        source: String,
    },
    /// Run a scripted session against the headless engine
    Demo,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result: Result<(), CliError> = match cli.command {
        Command::Probe { layer } => commands::probe::run(&layer).await,
        Command::Fetch { source } => commands::fetch::run(&source).await,
        Command::Demo => commands::demo::run().await,
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
