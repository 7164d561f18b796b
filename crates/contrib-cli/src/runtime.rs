//! The in-process runtime contribd deploys into.
//!
//! Contribution files carry already structured [`PropertiesContribution`]
//! values under a `contribution` list. Deploying a file registers its
//! contributions against the `properties` extension point with the file's
//! URL as source; undeploying unregisters everything from that source.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use contrib_core::{Component, HookError, ManagedComponent, PropertiesContribution};
use contrib_deploy::{ConfigLocation, RuntimeContext};
use serde::Deserialize;

use crate::error::{CliError, Result};

/// Extension point every contribution file targets.
pub const EXTENSION_POINT: &str = "properties";

#[derive(Debug, Default, Deserialize)]
struct ContributionFile {
    #[serde(default, rename = "contribution")]
    contributions: Vec<PropertiesContribution>,
}

/// Read the contributions in `path`.
///
/// Format is detected from file extension:
/// - `.toml` -> TOML
/// - `.json` -> JSON
/// - `.yaml`, `.yml` -> YAML
pub fn load_contributions(path: &Path) -> Result<Vec<PropertiesContribution>> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let parse_error = |format: &str, message: String| CliError::Contributions {
        path: path.to_path_buf(),
        format: format.into(),
        message,
    };
    let file: ContributionFile = match extension.to_lowercase().as_str() {
        "toml" => toml::from_str(&content).map_err(|e| parse_error("TOML", e.to_string()))?,
        "json" => serde_json::from_str(&content).map_err(|e| parse_error("JSON", e.to_string()))?,
        "yaml" | "yml" => {
            serde_yaml::from_str(&content).map_err(|e| parse_error("YAML", e.to_string()))?
        }
        _ => {
            return Err(CliError::user(format!(
                "Unsupported contribution file format: {extension}"
            )));
        }
    };
    Ok(file.contributions)
}

/// Logs every install and uninstall.
pub struct LoggingComponent;

impl Component<PropertiesContribution> for LoggingComponent {
    fn install(&self, contribution: &PropertiesContribution) -> std::result::Result<(), HookError> {
        let properties = serde_json::Value::Object(contribution.properties.clone());
        tracing::info!(contribution = %contribution.id, %properties, "Installed");
        Ok(())
    }

    fn uninstall(&self, contribution: &PropertiesContribution) -> std::result::Result<(), HookError> {
        tracing::info!(contribution = %contribution.id, "Uninstalled");
        Ok(())
    }
}

/// Deploys contribution files into a managed component.
pub struct ComponentContext {
    component: Arc<ManagedComponent>,
}

impl ComponentContext {
    pub fn new(component: Arc<ManagedComponent>) -> Self {
        Self { component }
    }
}

impl RuntimeContext for ComponentContext {
    fn deploy(&self, location: &ConfigLocation) -> std::result::Result<(), HookError> {
        let ConfigLocation::File(path) = location else {
            return Err(format!("{location} is not a local file").into());
        };
        let contributions: Vec<Box<dyn Any + Send>> = load_contributions(path)?
            .into_iter()
            .map(|c| Box::new(c) as Box<dyn Any + Send>)
            .collect();
        let url = location.external_form();
        let count = self
            .component
            .register_extension_from(EXTENSION_POINT, contributions, Some(&url));
        tracing::debug!(url = %url, count, "Registered contributions");
        Ok(())
    }

    fn undeploy(&self, location: &ConfigLocation) -> std::result::Result<(), HookError> {
        let url = location.external_form();
        let count = self.component.unregister_by_source(&url);
        tracing::debug!(url = %url, count, "Unregistered contributions");
        Ok(())
    }
}
