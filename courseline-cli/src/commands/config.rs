//! Configuration CLI commands.
//!
//! Provides `config path` and `config show`.

use std::path::PathBuf;

use clap::Subcommand;
use courseline::config::ConfigFile;

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration (API key masked)
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<PathBuf>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(config_path),
        ConfigCommands::Show => run_show(config_path),
    }
}

fn run_path(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path
        .or_else(ConfigFile::default_path)
        .ok_or_else(|| CliError::Config("could not determine home directory".to_string()))?;
    let marker = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("{}{}", path.display(), marker);
    Ok(())
}

fn run_show(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    print!("{}", config.to_ini_string(true));
    Ok(())
}
