//! `contribd check-config`

use std::path::Path;

use contrib_deploy::RuntimeConfig;

use crate::error::Result;

/// Load `path` and print the effective configuration as TOML.
pub fn run_check_config(path: &Path) -> Result<()> {
    let config = RuntimeConfig::load(path)?;
    tracing::debug!(path = %path.display(), "Loaded runtime configuration");
    print!("{}", config.to_toml());
    Ok(())
}
