//! Error handling for the neuromap CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] neuromap_storage::StorageError),

    /// Connector layer error
    #[error("Connector error: {0}")]
    Connect(#[from] neuromap_connect::ConnectError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bincode output error
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Generic error
    #[error("Error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }
}
