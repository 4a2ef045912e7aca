//! Courseline CLI - Command-line interface
//!
//! Drives the navigation engine from recorded trips, either fully offline
//! (`replay`) or against Google Maps Platform (`navigate`).

mod commands;
mod error;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use courseline::geo::GeoPoint;

use commands::common::{parse_point, OutputFormat};
use commands::config::ConfigCommands;
use commands::navigate::NavigateArgs;
use commands::replay::ReplayArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "courseline", version, about = "Turn-by-turn navigation engine")]
struct Cli {
    /// Configuration file (default: ~/.courseline/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a recorded trip against a route file, fully offline
    Replay {
        /// Route as JSON
        #[arg(long)]
        route: PathBuf,

        /// Recorded fixes as a JSON array
        #[arg(long)]
        fixes: PathBuf,

        /// Posted speed limit in km/h applied to every snapped point
        #[arg(long)]
        speed_limit: Option<f64>,

        /// Pause between fixes in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Plan a route with Google Maps and follow recorded fixes
    Navigate {
        /// Start as "lat,lon"
        #[arg(long, value_parser = point_arg)]
        origin: GeoPoint,

        /// Destination as "lat,lon"
        #[arg(long, value_parser = point_arg)]
        destination: GeoPoint,

        /// Intermediate stop as "lat,lon"; repeat for several
        #[arg(long = "waypoint", value_parser = point_arg)]
        waypoints: Vec<GeoPoint>,

        /// Recorded fixes as a JSON array
        #[arg(long)]
        fixes: PathBuf,

        /// Maps Platform API key (overrides config)
        #[arg(long)]
        api_key: Option<String>,

        /// Pause between fixes in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn point_arg(raw: &str) -> Result<GeoPoint, String> {
    parse_point(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Replay {
            route,
            fixes,
            speed_limit,
            interval_ms,
            format,
        } => {
            commands::replay::run(ReplayArgs {
                route,
                fixes,
                config: cli.config,
                speed_limit,
                interval_ms,
                format,
            })
            .await
        }
        Commands::Navigate {
            origin,
            destination,
            waypoints,
            fixes,
            api_key,
            interval_ms,
            format,
        } => {
            commands::navigate::run(NavigateArgs {
                origin,
                destination,
                waypoints,
                fixes,
                config: cli.config,
                api_key,
                interval_ms,
                format,
            })
            .await
        }
        Commands::Config { command } => commands::config::run(command, cli.config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_navigate_with_waypoints() {
        let cli = Cli::try_parse_from([
            "courseline",
            "navigate",
            "--origin",
            "52.5,13.4",
            "--destination",
            "52.6,13.5",
            "--waypoint",
            "52.55,13.45",
            "--waypoint",
            "52.58,13.48",
            "--fixes",
            "trip.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Navigate {
                origin, waypoints, ..
            } => {
                assert_eq!(origin, GeoPoint::new(52.5, 13.4));
                assert_eq!(waypoints.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_point_is_rejected() {
        assert!(Cli::try_parse_from([
            "courseline",
            "navigate",
            "--origin",
            "somewhere",
            "--destination",
            "52.6,13.5",
            "--fixes",
            "trip.json",
        ])
        .is_err());
    }
}
