//! Benchmap CLI - Command-line interface
//!
//! Headless driver for the benchmap library: list points near a location,
//! search inscriptions, and run a demo session that exercises the viewport
//! controller and tile prefetcher end to end.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use benchmap::SessionConfig;

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "benchmap", version, about = "Bench map session engine")]
struct Cli {
    /// Path to a config.ini (defaults to the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List points near a coordinate
    Points {
        /// Latitude of the search center
        #[arg(long)]
        lat: f64,
        /// Longitude of the search center
        #[arg(long)]
        lon: f64,
        /// Search radius in meters
        #[arg(long)]
        radius: Option<u32>,
    },

    /// Search points by inscription text
    Search {
        /// Free-text query
        query: String,
    },

    /// Run a headless session with simulated movement
    Start {
        /// Starting latitude
        #[arg(long)]
        lat: Option<f64>,
        /// Starting longitude
        #[arg(long)]
        lon: Option<f64>,
        /// Starting zoom level
        #[arg(long)]
        zoom: Option<f64>,
        /// Provider mode: raster or vector
        #[arg(long)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Points { lat, lon, radius } => {
            commands::points::nearby(&config, lat, lon, radius).await
        }
        Commands::Search { query } => commands::points::search(&config, &query).await,
        Commands::Start {
            lat,
            lon,
            zoom,
            provider,
        } => commands::start::run(config, lat, lon, zoom, provider).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Resolve the session config: explicit path, else the default location if
/// one exists, else built-in defaults.
fn load_config(path: Option<PathBuf>) -> Result<SessionConfig, CliError> {
    if let Some(path) = path {
        return SessionConfig::load(&path).map_err(|e| CliError::Config(e.to_string()));
    }

    match SessionConfig::default_path() {
        Some(path) if path.exists() => {
            SessionConfig::load(&path).map_err(|e| CliError::Config(e.to_string()))
        }
        _ => Ok(SessionConfig::default()),
    }
}
