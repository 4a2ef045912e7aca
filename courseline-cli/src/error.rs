//! CLI error type.

use courseline::config::ConfigError;
use courseline::location::LocationError;
use courseline::navigation::NavigationError;
use courseline::provider::ProviderError;
use thiserror::Error;

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
