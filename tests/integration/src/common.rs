//! Shared setup: deployer -> runtime context -> managed component ->
//! contribution manager -> recording component.

#![allow(dead_code)]

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contrib_core::{
    Component, ContributionManager, HookError, ManagedComponent, PropertiesContribution,
};
use contrib_deploy::{ConfigLocation, ConfigurationDeployer, FileChangeNotifier, RuntimeContext};
use contrib_test_utils::{ChangeRecorder, RecordingComponent, WatchedDir};
use serde::Deserialize;
use serde_json::Value;

pub const POINT: &str = "settings";

#[derive(Deserialize)]
struct ContributionFile {
    contribution: Vec<PropertiesContribution>,
}

/// Registers the contributions of a JSON file, using the file URL as source.
pub struct JsonContext {
    component: Arc<ManagedComponent>,
}

impl RuntimeContext for JsonContext {
    fn deploy(&self, location: &ConfigLocation) -> Result<(), HookError> {
        let path = location.watch_path().ok_or("not a local file")?;
        let file: ContributionFile = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let contributions = file
            .contribution
            .into_iter()
            .map(|c| Box::new(c) as Box<dyn Any + Send>)
            .collect();
        self.component.register_extension_from(
            POINT,
            contributions,
            Some(&location.external_form()),
        );
        Ok(())
    }

    fn undeploy(&self, location: &ConfigLocation) -> Result<(), HookError> {
        self.component
            .unregister_by_source(&location.external_form());
        Ok(())
    }
}

pub struct Runtime {
    pub dir: WatchedDir,
    pub notifier: Arc<FileChangeNotifier>,
    pub deployer: Arc<ConfigurationDeployer>,
    pub context: Arc<dyn RuntimeContext>,
    pub installed: Arc<RecordingComponent<PropertiesContribution>>,
    pub manager: Arc<ContributionManager<PropertiesContribution>>,
    pub changes: Arc<ChangeRecorder>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_notifier(FileChangeNotifier::new())
    }

    pub fn with_notifier(notifier: FileChangeNotifier) -> Self {
        let component = Arc::new(ManagedComponent::new("app"));
        let installed = Arc::new(RecordingComponent::<PropertiesContribution>::new());
        let manager = component
            .add_manager::<PropertiesContribution>(POINT, installed.clone() as Arc<dyn Component<_>>)
            .unwrap();

        let notifier = Arc::new(notifier);
        let deployer = ConfigurationDeployer::new(Arc::clone(&notifier));
        let changes = Arc::new(ChangeRecorder::new());
        deployer.add_listener(changes.clone());

        Self {
            dir: WatchedDir::new(),
            notifier,
            deployer,
            context: Arc::new(JsonContext { component }),
            installed,
            manager,
            changes,
        }
    }

    /// Write a contribution file.
    pub fn write(&self, name: &str, contributions: Value) -> PathBuf {
        self.dir
            .write(name, &serde_json::json!({ "contribution": contributions }).to_string())
    }

    /// Rewrite a contribution file with a newer modification time.
    pub fn rewrite(&self, path: &Path, contributions: Value) {
        self.dir.modify(
            path,
            &serde_json::json!({ "contribution": contributions }).to_string(),
        );
    }

    pub fn deploy(&self, path: &Path) -> ConfigLocation {
        let location = ConfigLocation::from_path(path);
        self.deployer
            .deploy(Arc::clone(&self.context), location.clone(), true)
            .unwrap();
        location
    }

    /// A property of the value currently installed for `id`.
    pub fn installed_property(&self, id: &str, key: &str) -> Option<Value> {
        self.manager
            .installed(id)
            .and_then(|c| c.get(key).cloned())
    }
}
