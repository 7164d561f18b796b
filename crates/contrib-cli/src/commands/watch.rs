//! `contribd watch`

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use contrib_core::{Component, ContributionManager, ManagedComponent, PropertiesContribution};
use contrib_deploy::{
    ConfigLocation, ConfigurationDeployer, ConfigurationListener, DeployedConfiguration,
    FileChangeNotifier, RuntimeConfig, RuntimeContext,
};

use crate::error::Result;
use crate::runtime::{ComponentContext, EXTENSION_POINT, LoggingComponent};

type Manager = ContributionManager<PropertiesContribution>;

/// Reports the runtime state after every hot redeploy.
struct ChangeReporter {
    manager: Arc<Manager>,
    pending_warning: Option<Duration>,
}

impl ConfigurationListener for ChangeReporter {
    fn configuration_changed(&self, configuration: &DeployedConfiguration) {
        tracing::info!(url = %configuration.location, "Configuration changed");
        report(&self.manager, self.pending_warning);
    }
}

/// Deploy `files`, watch them until stdin closes, then undeploy.
pub fn run_watch(files: &[PathBuf], config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let pending_warning = config.resolution.pending_warning();

    let component = Arc::new(ManagedComponent::new("contribd"));
    let manager = component.add_manager::<PropertiesContribution>(
        EXTENSION_POINT,
        Arc::new(LoggingComponent) as Arc<dyn Component<_>>,
    )?;

    let notifier = Arc::new(FileChangeNotifier::with_config(config.notifier));
    let deployer = ConfigurationDeployer::new(Arc::clone(&notifier));
    deployer.add_listener(Arc::new(ChangeReporter {
        manager: Arc::clone(&manager),
        pending_warning,
    }));

    let context: Arc<dyn RuntimeContext> = Arc::new(ComponentContext::new(component));
    for file in files {
        deployer.deploy(Arc::clone(&context), ConfigLocation::from_path(file), true)?;
    }
    report(&manager, pending_warning);

    notifier.start()?;
    tracing::info!(files = files.len(), "Watching for changes, Ctrl-D to stop");

    let result = wait_for_eof(&manager, pending_warning);

    notifier.stop();
    deployer.undeploy_all();
    result
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    if let Some(path) = path {
        return Ok(RuntimeConfig::load(path)?);
    }
    match dirs::config_dir().map(|dir| dir.join("contribd").join("runtime.toml")) {
        Some(default) if default.is_file() => {
            tracing::debug!(path = %default.display(), "Using default runtime configuration");
            Ok(RuntimeConfig::load(&default)?)
        }
        _ => Ok(RuntimeConfig::default()),
    }
}

fn wait_for_eof(manager: &Manager, pending_warning: Option<Duration>) -> Result<()> {
    for line in io::stdin().lock().lines() {
        line?;
        report(manager, pending_warning);
    }
    Ok(())
}

/// Print installed and pending contributions.
fn report(manager: &Manager, pending_warning: Option<Duration>) {
    println!("installed: {}", manager.installed_ids().join(", "));
    for (id, missing) in manager.pending() {
        println!("pending: {id} (waiting for {})", missing.join(", "));
    }
    if let Some(threshold) = pending_warning {
        manager.stale_pending(threshold);
    }
}
