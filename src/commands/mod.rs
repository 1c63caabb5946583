pub mod diff;
pub mod get;
pub mod manifest;
pub mod set;
pub mod types;

use anyhow::Result;
use resource_api::{Registry, SystemRunner};
use std::sync::Arc;

use crate::config::RapiConfig;
use crate::resource;

/// Registry backed by real processes and the user's config
pub fn load_registry() -> Result<Registry> {
    let config = RapiConfig::load()?;
    resource::registry(&config, Arc::new(SystemRunner))
}
