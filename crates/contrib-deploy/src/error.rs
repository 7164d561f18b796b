//! Error types for contrib-deploy

use std::path::PathBuf;

use contrib_core::HookError;

/// Result type for contrib-deploy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in contrib-deploy operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration already deployed: {url}")]
    AlreadyDeployed { url: String },

    #[error("Invalid configuration location {location:?}: {message}")]
    InvalidLocation { location: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deploy {url}: {source}")]
    Deploy {
        url: String,
        #[source]
        source: HookError,
    },

    #[error("Failed to undeploy {url}: {source}")]
    Undeploy {
        url: String,
        #[source]
        source: HookError,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Failed to spawn file change notifier thread: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_location(location: &str, message: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.to_string(),
            message: message.into(),
        }
    }
}
