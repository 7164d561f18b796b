//! Configuration deployment with hot reload.
//!
//! [`ConfigurationDeployer`] deploys configurations into a [`RuntimeContext`]
//! and, when asked to, watches their backing file. When the notifier reports
//! a change the configuration is undeployed and deployed again, then
//! [`ConfigurationListener`]s are told about it.
//!
//! Deploy, undeploy and redeploy all run under one lock per deployer, and
//! the runtime context is called while it is held. Contexts must not call
//! back into the deployer that invoked them.

use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use contrib_core::{HookError, ListenerList};
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::location::ConfigLocation;
use crate::notifier::{FileChangeListener, FileChangeNotifier, FileEntry};

/// Where deployed configurations take effect.
///
/// `undeploy` is always called with a location equal to the one previously
/// passed to `deploy`.
pub trait RuntimeContext: Send + Sync {
    fn deploy(&self, location: &ConfigLocation) -> std::result::Result<(), HookError>;

    fn undeploy(&self, location: &ConfigLocation) -> std::result::Result<(), HookError>;
}

/// A configuration currently deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedConfiguration {
    pub location: ConfigLocation,
    /// File polled for changes, when change tracking is on
    pub watch_path: Option<PathBuf>,
    /// When the configuration was last (re)deployed
    pub deployed_at: DateTime<Utc>,
    /// Detection stamp of the last change that triggered a redeploy
    pub last_change: Option<SystemTime>,
}

/// Observer of hot redeploys.
pub trait ConfigurationListener: Send + Sync {
    fn configuration_changed(&self, configuration: &DeployedConfiguration);
}

struct Deployment {
    context: Arc<dyn RuntimeContext>,
    info: DeployedConfiguration,
    /// Whether the context currently holds this configuration. Cleared when
    /// a redeploy fails.
    live: bool,
}

impl Deployment {
    fn undeploy(&mut self) -> std::result::Result<(), HookError> {
        if !std::mem::replace(&mut self.live, false) {
            return Ok(());
        }
        self.context.undeploy(&self.info.location)
    }
}

/// Deploys configurations and redeploys them when their files change.
pub struct ConfigurationDeployer {
    notifier: Arc<FileChangeNotifier>,
    deployments: Mutex<IndexMap<String, Deployment>>,
    listeners: ListenerList<dyn ConfigurationListener>,
    watcher: Arc<dyn FileChangeListener>,
}

/// Forwards notifier callbacks without keeping the deployer alive.
struct ChangeForwarder(Weak<ConfigurationDeployer>);

impl FileChangeListener for ChangeForwarder {
    fn file_changed(&self, entry: &FileEntry, stamp: SystemTime) {
        if let Some(deployer) = self.0.upgrade() {
            deployer.redeploy(&entry.id, stamp);
        }
    }
}

impl ConfigurationDeployer {
    /// Create a deployer reporting to `notifier`'s change events.
    pub fn new(notifier: Arc<FileChangeNotifier>) -> Arc<Self> {
        let deployer = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            notifier: Arc::clone(&notifier),
            deployments: Mutex::new(IndexMap::new()),
            listeners: ListenerList::new(),
            watcher: Arc::new(ChangeForwarder(weak.clone())),
        });
        notifier.add_listener(Arc::clone(&deployer.watcher));
        deployer
    }

    pub fn notifier(&self) -> &Arc<FileChangeNotifier> {
        &self.notifier
    }

    /// Deploy `location` into `context`.
    ///
    /// With `track_changes`, the location's backing file (the archive for
    /// `jar:` locations) is watched and a change redeploys it. Locations
    /// without a local file are deployed but not watched.
    pub fn deploy(
        &self,
        context: Arc<dyn RuntimeContext>,
        location: ConfigLocation,
        track_changes: bool,
    ) -> Result<()> {
        let url = location.external_form();
        let mut deployments = self.deployments.lock();
        if deployments.contains_key(&url) {
            return Err(Error::AlreadyDeployed { url });
        }

        context.deploy(&location).map_err(|source| Error::Deploy {
            url: url.clone(),
            source,
        })?;

        let watch_path = if track_changes {
            match location.watch_path() {
                Some(path) => {
                    self.notifier.watch(&url, path);
                    Some(path.to_path_buf())
                }
                None => {
                    tracing::debug!(url = %url, "Location has no local file, changes are not tracked");
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(url = %url, tracked = watch_path.is_some(), "Deployed configuration");
        deployments.insert(
            url,
            Deployment {
                context,
                info: DeployedConfiguration {
                    location,
                    watch_path,
                    deployed_at: Utc::now(),
                    last_change: None,
                },
                live: true,
            },
        );
        Ok(())
    }

    /// Parse `url` and deploy it.
    pub fn deploy_url(
        &self,
        context: Arc<dyn RuntimeContext>,
        url: &str,
        track_changes: bool,
    ) -> Result<()> {
        self.deploy(context, ConfigLocation::parse(url)?, track_changes)
    }

    /// Undeploy `location`. Returns `Ok(false)` if it was not deployed.
    ///
    /// The deployment is forgotten even when the context fails to undeploy
    /// it, so a second call is always a no-op. A configuration whose last
    /// redeploy failed is not in the context and is only forgotten.
    pub fn undeploy(&self, location: &ConfigLocation) -> Result<bool> {
        let url = location.external_form();
        let mut deployments = self.deployments.lock();
        let Some(mut deployment) = deployments.shift_remove(&url) else {
            tracing::debug!(url = %url, "Not deployed, nothing to undeploy");
            return Ok(false);
        };
        self.notifier.unwatch(&url);

        deployment
            .undeploy()
            .map_err(|source| Error::Undeploy {
                url: url.clone(),
                source,
            })?;
        tracing::info!(url = %url, "Undeployed configuration");
        Ok(true)
    }

    /// Undeploy everything, most recently deployed first. Failures are
    /// logged. Returns how many configurations were undeployed.
    pub fn undeploy_all(&self) -> usize {
        let mut deployments = self.deployments.lock();
        let mut count = 0;
        while let Some((url, mut deployment)) = deployments.pop() {
            self.notifier.unwatch(&url);
            match deployment.undeploy() {
                Ok(()) => tracing::info!(url = %url, "Undeployed configuration"),
                Err(err) => {
                    tracing::error!(url = %url, error = %err, "Failed to undeploy configuration")
                }
            }
            count += 1;
        }
        count
    }

    pub fn is_deployed(&self, location: &ConfigLocation) -> bool {
        self.deployments
            .lock()
            .contains_key(&location.external_form())
    }

    /// External forms of every deployed location, sorted.
    pub fn deployed(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.deployments.lock().keys().cloned().collect();
        urls.sort();
        urls
    }

    pub fn get(&self, location: &ConfigLocation) -> Option<DeployedConfiguration> {
        self.deployments
            .lock()
            .get(&location.external_form())
            .map(|d| d.info.clone())
    }

    /// The file watched for `location`, if it is deployed with change
    /// tracking.
    pub fn watched_path(&self, location: &ConfigLocation) -> Option<PathBuf> {
        self.deployments
            .lock()
            .get(&location.external_form())
            .and_then(|d| d.info.watch_path.clone())
    }

    pub fn add_listener(&self, listener: Arc<dyn ConfigurationListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConfigurationListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Undeploy and deploy the configuration watched under `url`.
    ///
    /// A detection stamp already handled for this configuration is ignored,
    /// so one change yields one cycle however many times it is reported.
    fn redeploy(&self, url: &str, stamp: SystemTime) {
        let changed = {
            let mut deployments = self.deployments.lock();
            let Some(deployment) = deployments.get_mut(url) else {
                return;
            };
            if deployment.info.last_change == Some(stamp) {
                return;
            }
            deployment.info.last_change = Some(stamp);

            if let Err(err) = deployment.undeploy() {
                tracing::error!(url, error = %err, "Failed to undeploy changed configuration");
            }
            match deployment.context.deploy(&deployment.info.location) {
                Ok(()) => {
                    deployment.live = true;
                    deployment.info.deployed_at = Utc::now();
                    tracing::info!(url, "Redeployed changed configuration");
                    Some(deployment.info.clone())
                }
                Err(err) => {
                    tracing::error!(url, error = %err, "Failed to redeploy changed configuration");
                    None
                }
            }
        };

        if let Some(configuration) = changed {
            for listener in self.listeners.snapshot().iter() {
                listener.configuration_changed(&configuration);
            }
        }
    }
}

impl Drop for ConfigurationDeployer {
    fn drop(&mut self) {
        self.notifier.remove_listener(&self.watcher);
        for url in self.deployments.get_mut().keys() {
            self.notifier.unwatch(url);
        }
    }
}

impl std::fmt::Debug for ConfigurationDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationDeployer")
            .field("deployed", &self.deployed())
            .finish()
    }
}
