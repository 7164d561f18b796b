//! Runtime contexts and listeners for deployer tests.

use std::collections::HashSet;
use std::time::Duration;

use contrib_core::HookError;
use contrib_deploy::{ConfigLocation, ConfigurationListener, DeployedConfiguration, RuntimeContext};
use parking_lot::{Condvar, Mutex};

/// A runtime context that records `deploy:<url>` / `undeploy:<url>` calls.
#[derive(Default)]
pub struct RecordingContext {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deploys of `location` fail.
    pub fn fail_on(&self, location: &ConfigLocation) {
        self.failing.lock().insert(location.external_form());
    }

    pub fn succeed_on(&self, location: &ConfigLocation) {
        self.failing.lock().remove(&location.external_form());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls equal to `call`.
    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl RuntimeContext for RecordingContext {
    fn deploy(&self, location: &ConfigLocation) -> Result<(), HookError> {
        let url = location.external_form();
        self.calls.lock().push(format!("deploy:{url}"));
        if self.failing.lock().contains(&url) {
            return Err(format!("refusing to deploy {url}").into());
        }
        Ok(())
    }

    fn undeploy(&self, location: &ConfigLocation) -> Result<(), HookError> {
        self.calls
            .lock()
            .push(format!("undeploy:{}", location.external_form()));
        Ok(())
    }
}

/// Records `configuration_changed` notifications and lets tests wait for
/// them.
#[derive(Default)]
pub struct ChangeRecorder {
    changes: Mutex<Vec<DeployedConfiguration>>,
    arrived: Condvar,
}

impl ChangeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<DeployedConfiguration> {
        self.changes.lock().clone()
    }

    /// Wait until at least `count` changes arrived. Returns `false` on
    /// timeout.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let mut changes = self.changes.lock();
        while changes.len() < count {
            if self.arrived.wait_for(&mut changes, timeout).timed_out() {
                return changes.len() >= count;
            }
        }
        true
    }
}

impl ConfigurationListener for ChangeRecorder {
    fn configuration_changed(&self, configuration: &DeployedConfiguration) {
        self.changes.lock().push(configuration.clone());
        self.arrived.notify_all();
    }
}
