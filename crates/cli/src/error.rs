//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration loading, parsing or validation error
    #[error("Invalid configuration: {0}")]
    Config(#[source] contracts::ContractError),

    /// Frame source failed to start
    #[error("Capture source error: {0}")]
    Source(#[source] contracts::ContractError),

    /// Publish endpoints could not be set up
    #[error("Publisher error: {0}")]
    Publisher(#[from] publisher::PublisherError),

    /// Error while stopping the broadcaster
    #[error("Error during shutdown: {message}")]
    Shutdown { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
