//! Configuration deployment and hot reload.
//!
//! - [`location`]: identities of deployable configurations and the files
//!   backing them
//! - [`notifier`]: polling file change detection
//! - [`deployer`]: deploy/undeploy into a runtime context, redeploy on change
//! - [`config`]: runtime settings

pub mod config;
pub mod deployer;
pub mod error;
pub mod location;
pub mod notifier;

pub use config::{NotifierConfig, ResolutionConfig, RuntimeConfig};
pub use deployer::{ConfigurationDeployer, ConfigurationListener, DeployedConfiguration, RuntimeContext};
pub use error::{Error, Result};
pub use location::ConfigLocation;
pub use notifier::{FileChangeListener, FileChangeNotifier, FileEntry};
