//! Runtime configuration.
//!
//! Loaded from TOML, JSON or YAML depending on the file extension. Every
//! field has a default, so an empty file is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub notifier: NotifierConfig,
    pub resolution: ResolutionConfig,
}

/// File change polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Delay before the first poll, in milliseconds
    pub initial_delay_ms: u64,
    /// Delay between polls, in milliseconds
    pub interval_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 10_000,
            interval_ms: 2_000,
        }
    }
}

impl NotifierConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Contribution resolution diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Warn about contributions pending longer than this, in milliseconds.
    /// Unset means pending contributions are never reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_warning_ms: Option<u64>,
}

impl ResolutionConfig {
    pub fn pending_warning(&self) -> Option<Duration> {
        self.pending_warning_ms.map(Duration::from_millis)
    }
}

impl RuntimeConfig {
    /// Load configuration from a file.
    ///
    /// Format is detected from file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            }),
            "json" => serde_json::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "JSON".into(),
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "YAML".into(),
                message: e.to_string(),
            }),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse {
            path: "<inline>".into(),
            format: "TOML".into(),
            message: e.to_string(),
        })
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> String {
        // Plain structs of integers always serialize.
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
