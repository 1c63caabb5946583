//! Concrete resource types and their providers
//!
//! - `apt_key` - GPG keys in apt's keyring
//! - `iis_application_pool` - IIS pools through a PowerShell proxy
//! - `package_rpm`, `package_apt` - definition-only package types

pub mod apt_key;
pub mod gpg;
pub mod iis_application_pool;
pub mod package;

#[cfg(test)]
pub mod testing;

use anyhow::{Context, Result};
use resource_api::{CommandRunner, Registry};
use std::sync::Arc;

use crate::config::RapiConfig;
use apt_key::AptKeyProvider;
use iis_application_pool::IisApplicationPoolProvider;

/// Every type this binary knows, with providers where they exist
pub fn registry(config: &RapiConfig, runner: Arc<dyn CommandRunner>) -> Result<Registry> {
    let mut registry = Registry::new();

    registry
        .define(apt_key::definition(&config.apt_key.keyserver))
        .context("Invalid apt_key configuration")?;
    registry.implement(
        "apt_key",
        AptKeyProvider::new(runner.clone(), config.apt_key.clone()),
    )?;

    let scripts_dir = config
        .iis
        .scripts_dir()
        .context("Failed to resolve IIS scripts directory")?;
    registry.define(iis_application_pool::definition())?;
    registry.implement(
        "iis_application_pool",
        IisApplicationPoolProvider::new(runner, &config.iis.powershell, scripts_dir),
    )?;

    registry.define(package::package_rpm())?;
    registry.define(package::package_apt())?;

    log::debug!("registered {} resource types", registry.len());
    Ok(registry)
}
