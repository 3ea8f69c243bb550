//! Shelter adoption pipeline CLI
//!
//! Trains the adoption model, scores animals, clusters behavior profiles
//! and runs diagnostics, either against local artifacts or a running
//! adoption server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shelter adoption pipeline CLI
#[derive(Parser)]
#[command(name = "shelterctl")]
#[command(author, version, about = "CLI for the shelter adoption pipeline", long_about = None)]
pub struct Cli {
    /// Pipeline config file (defaults to ~/.config/shelterctl/config.toml if present)
    #[arg(long, short, env = "SHELTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Adoption server URL; predict, health and model query it instead of local artifacts
    #[arg(long, env = "SHELTER_SERVER_URL")]
    pub server: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the adoption model from the record export
    Train {
        /// Record export to train on (overrides the config)
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Score one animal's adoption likelihood
    #[command(group(ArgGroup::new("input").required(true).args(["file", "id"])))]
    Predict {
        /// JSON prediction request or shelter record
        #[arg(long)]
        file: Option<PathBuf>,

        /// Animal id to look up in the record export
        #[arg(long)]
        id: Option<String>,

        /// Record export used by --id (overrides the config)
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Cluster behavior profiles into adopter recommendations
    Cluster {
        /// Record export to cluster (overrides the config)
        #[arg(long)]
        records: Option<PathBuf>,

        /// Persist the cluster model next to the adoption model
        #[arg(long)]
        save: bool,
    },

    /// Run the end-to-end load and predict diagnostic
    Health {
        /// Record export supplying the sample record (overrides the config)
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Show the model predictions are served from
    Model,
}

impl Commands {
    fn records_override(&self) -> Option<&PathBuf> {
        match self {
            Commands::Train { records }
            | Commands::Predict { records, .. }
            | Commands::Cluster { records, .. }
            | Commands::Health { records } => records.as_ref(),
            Commands::Model => None,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let pipeline = config::load(cli.config.as_deref(), cli.command.records_override().map(PathBuf::as_path))?;
    let server = cli.server.as_deref().map(client::ApiClient::new).transpose()?;

    match &cli.command {
        Commands::Train { .. } => {
            commands::train::run(&pipeline, server.as_ref(), cli.format).await?;
        }
        Commands::Predict { file, id, .. } => {
            commands::predict::run(&pipeline, server.as_ref(), file.as_deref(), id.as_deref(), cli.format).await?;
        }
        Commands::Cluster { save, .. } => {
            commands::cluster::run(&pipeline, *save, cli.verbose, cli.format)?;
        }
        Commands::Health { .. } => {
            if !commands::health::run(&pipeline, server.as_ref(), cli.format).await? {
                std::process::exit(1);
            }
        }
        Commands::Model => {
            commands::model::run(&pipeline, server.as_ref(), cli.format).await?;
        }
    }

    Ok(())
}
