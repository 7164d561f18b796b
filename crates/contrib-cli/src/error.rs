//! Error types for contrib-cli

use std::path::PathBuf;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from contrib-core
    #[error(transparent)]
    Core(#[from] contrib_core::Error),

    /// Error from contrib-deploy
    #[error(transparent)]
    Deploy(#[from] contrib_deploy::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A contribution file could not be read
    #[error("Failed to parse {format} contributions at {path}: {message}")]
    Contributions {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// Logging could not be set up
    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
